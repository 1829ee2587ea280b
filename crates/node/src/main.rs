//! spendgraph: extract a value-flow address graph from raw block dumps.
//!
//! Two full scans of the dump files build, then resolve, a disk-backed
//! pending-spend index; the resulting `sender receiver` arc lines feed an
//! external graph-compression stage.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use spendgraph_log as logging;
use spendgraph_log::log_info;
use spendgraph_pipeline::{extract, ExtractorConfig};
use spendgraph_primitives::Network;
use spendgraph_storage::fjall::FjallStore;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_DB_PATH: &str = "spendgraph-db";

struct Config {
    block_files: Vec<PathBuf>,
    blocks_dir: Option<PathBuf>,
    network: Network,
    db_path: PathBuf,
    workers: Option<usize>,
    queue_capacity: Option<usize>,
    arc_queue_capacity: Option<usize>,
    output: Option<PathBuf>,
    log_level: logging::Level,
    log_format: logging::Format,
    log_timestamps: bool,
}

enum CliAction {
    Run(Config),
    PrintHelp,
    PrintVersion,
}

fn main() {
    match parse_args() {
        Ok(CliAction::Run(config)) => {
            logging::init(logging::LogConfig {
                level: config.log_level,
                format: config.log_format,
                timestamps: config.log_timestamps,
            });
            if let Err(err) = run(&config) {
                eprintln!("{err}");
                std::process::exit(1);
            }
        }
        Ok(CliAction::PrintHelp) => print_help(),
        Ok(CliAction::PrintVersion) => println!("spendgraph {VERSION}"),
        Err(err) => {
            eprintln!("{err}");
            eprintln!("Run 'spendgraph --help' for usage.");
            std::process::exit(1);
        }
    }
}

fn run(config: &Config) -> Result<(), String> {
    let files = collect_block_files(config)?;
    log_info!("Extracting spend graph from {} block files", files.len());

    let store = FjallStore::open(&config.db_path).map_err(|err| {
        format!(
            "failed to open store at {}: {err}",
            config.db_path.display()
        )
    })?;

    let mut extractor = ExtractorConfig::new(files, config.network);
    if let Some(workers) = config.workers {
        extractor.workers = workers;
        extractor.batch_queue_capacity = (workers / 2).max(1);
    }
    if let Some(capacity) = config.queue_capacity {
        extractor.batch_queue_capacity = capacity;
    }
    if let Some(capacity) = config.arc_queue_capacity {
        extractor.arc_queue_capacity = capacity;
    }

    let mut stream = extract(extractor, store).map_err(|err| err.to_string())?;

    let mut out: BufWriter<Box<dyn Write>> = match &config.output {
        Some(path) => {
            let file = File::create(path)
                .map_err(|err| format!("failed to create {}: {err}", path.display()))?;
            BufWriter::new(Box::new(file))
        }
        None => BufWriter::new(Box::new(io::stdout().lock())),
    };

    let mut written = 0u64;
    for (sender, receiver) in stream.by_ref() {
        writeln!(out, "{sender} {receiver}").map_err(|err| format!("failed to write arc: {err}"))?;
        written += 1;
    }
    out.flush()
        .map_err(|err| format!("failed to flush output: {err}"))?;

    stream.finish().map_err(|err| err.to_string())?;
    log_info!("Wrote {written} arcs");
    Ok(())
}

fn collect_block_files(config: &Config) -> Result<Vec<PathBuf>, String> {
    if !config.block_files.is_empty() {
        return Ok(config.block_files.clone());
    }

    let Some(dir) = &config.blocks_dir else {
        return Err("no block files given; list them or pass --blocks-dir".to_string());
    };

    let entries =
        std::fs::read_dir(dir).map_err(|err| format!("failed to read {}: {err}", dir.display()))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| format!("failed to read {}: {err}", dir.display()))?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with("blk") && name.ends_with(".dat") {
            files.push(entry.path());
        }
    }
    if files.is_empty() {
        return Err(format!("no blk*.dat files found in {}", dir.display()));
    }
    files.sort();
    Ok(files)
}

fn parse_args() -> Result<CliAction, String> {
    parse_args_from(std::env::args().skip(1))
}

fn parse_args_from<I>(raw_args: I) -> Result<CliAction, String>
where
    I: IntoIterator<Item = String>,
{
    let mut block_files: Vec<PathBuf> = Vec::new();
    let mut blocks_dir: Option<PathBuf> = None;
    let mut network = Network::Mainnet;
    let mut db_path: Option<PathBuf> = None;
    let mut workers: Option<usize> = None;
    let mut queue_capacity: Option<usize> = None;
    let mut arc_queue_capacity: Option<usize> = None;
    let mut output: Option<PathBuf> = None;
    let mut log_level = logging::Level::Info;
    let mut log_format = logging::Format::Text;
    let mut log_timestamps = true;

    let mut args = raw_args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => return Ok(CliAction::PrintHelp),
            "--version" => return Ok(CliAction::PrintVersion),
            "--blocks-dir" => {
                blocks_dir = Some(PathBuf::from(required_value(&mut args, "--blocks-dir")?));
            }
            "--network" => {
                let raw = required_value(&mut args, "--network")?;
                network =
                    Network::parse(&raw).ok_or_else(|| format!("unknown network '{raw}'"))?;
            }
            "--db" => {
                db_path = Some(PathBuf::from(required_value(&mut args, "--db")?));
            }
            "--workers" => {
                workers = Some(parse_count(&required_value(&mut args, "--workers")?, "--workers")?);
            }
            "--queue-capacity" => {
                queue_capacity = Some(parse_count(
                    &required_value(&mut args, "--queue-capacity")?,
                    "--queue-capacity",
                )?);
            }
            "--arc-queue-capacity" => {
                arc_queue_capacity = Some(parse_count(
                    &required_value(&mut args, "--arc-queue-capacity")?,
                    "--arc-queue-capacity",
                )?);
            }
            "--output" => {
                output = Some(PathBuf::from(required_value(&mut args, "--output")?));
            }
            "--log-level" => {
                let raw = required_value(&mut args, "--log-level")?;
                log_level = logging::Level::parse(&raw)
                    .ok_or_else(|| format!("unknown log level '{raw}'"))?;
            }
            "--log-format" => {
                let raw = required_value(&mut args, "--log-format")?;
                log_format = logging::Format::parse(&raw)
                    .ok_or_else(|| format!("unknown log format '{raw}'"))?;
            }
            "--no-log-timestamps" => log_timestamps = false,
            other if other.starts_with("--") => return Err(format!("unknown flag '{other}'")),
            _ => block_files.push(PathBuf::from(arg)),
        }
    }

    Ok(CliAction::Run(Config {
        block_files,
        blocks_dir,
        network,
        db_path: db_path.unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
        workers,
        queue_capacity,
        arc_queue_capacity,
        output,
        log_level,
        log_format,
        log_timestamps,
    }))
}

fn required_value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String, String> {
    args.next()
        .ok_or_else(|| format!("{flag} requires a value"))
}

fn parse_count(raw: &str, flag: &str) -> Result<usize, String> {
    let value: usize = raw
        .parse()
        .map_err(|_| format!("{flag} expects a positive integer, got '{raw}'"))?;
    if value == 0 {
        return Err(format!("{flag} must be at least 1"));
    }
    Ok(value)
}

fn print_help() {
    println!(
        "spendgraph {VERSION}

Extract (sender, receiver) address-id arcs from raw block dump files.

USAGE:
    spendgraph [FLAGS] [BLOCK_FILE]...

FLAGS:
    --blocks-dir <dir>           scan <dir> for blk*.dat files (sorted)
    --network <name>             mainnet, testnet, or regtest (default mainnet)
    --db <path>                  persistent store directory (default {DEFAULT_DB_PATH})
    --workers <n>                worker threads per phase (default: CPU count)
    --queue-capacity <n>         bounded block/write queue capacity
    --arc-queue-capacity <n>     bounded arc queue capacity
    --output <path>              write 'sender receiver' lines here (default stdout)
    --log-level <level>          error, warn, info, debug, trace (default info)
    --log-format <format>        text or json (default text)
    --no-log-timestamps          omit timestamps from text logs
    -h, --help                   print this help
    --version                    print the version"
    );
}
