//! Two-phase extraction driver.
//!
//! Phase one scans every dump file and populates the address table and the
//! pending spend index; phase two scans the same files again and resolves
//! the accumulated entries into arcs. Two full scans are inherent to the
//! algorithm: a transaction's outputs may be referenced by spends appearing
//! either earlier or later in the file ordering.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, Receiver};

use spendgraph_index::{AddressTable, SpendIndex};
use spendgraph_primitives::Network;
use spendgraph_storage::{KeyValueStore, WriteBatch};

use crate::complete::complete_batch;
use crate::error::PipelineError;
use crate::framer::BlockLoader;
use crate::populate::populate_batch;
use crate::writer::run_writer;

#[derive(Clone, Debug)]
pub struct ExtractorConfig {
    pub block_files: Vec<PathBuf>,
    pub network: Network,
    pub workers: usize,
    pub batch_queue_capacity: usize,
    pub arc_queue_capacity: usize,
}

impl ExtractorConfig {
    pub fn new(block_files: Vec<PathBuf>, network: Network) -> Self {
        let workers = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self {
            block_files,
            network,
            workers,
            batch_queue_capacity: (workers / 2).max(1),
            arc_queue_capacity: 1024,
        }
    }
}

/// Run both phases against `store` and return the arc sequence of the
/// second. The caller drains the stream and then calls
/// [`ArcStream::finish`] to surface any worker failure.
pub fn extract<S>(config: ExtractorConfig, store: S) -> Result<ArcStream<S>, PipelineError>
where
    S: KeyValueStore + 'static,
{
    let store = Arc::new(store);
    let table = Arc::new(AddressTable::open(Arc::clone(&store))?);
    let spends = Arc::new(SpendIndex::new(Arc::clone(&store)));

    run_populate(&config, &store, &table, &spends)?;
    start_complete(config, store, table, spends)
}

fn run_populate<S>(
    config: &ExtractorConfig,
    store: &Arc<S>,
    table: &Arc<AddressTable<Arc<S>>>,
    spends: &Arc<SpendIndex<Arc<S>>>,
) -> Result<(), PipelineError>
where
    S: KeyValueStore + 'static,
{
    spendgraph_log::log_info!(
        "Populating spend mappings with {} workers over {} files",
        config.workers,
        config.block_files.len()
    );

    let (batch_tx, batch_rx) = bounded::<Vec<Vec<u8>>>(config.batch_queue_capacity);
    let (write_tx, write_rx) = bounded::<WriteBatch>(config.batch_queue_capacity);

    let loader = BlockLoader::new(
        config.block_files.clone(),
        config.network.magic(),
        batch_tx,
    );
    let loader_handle = spawn_named("block-loader", move || loader.run())?;

    let writer_store = Arc::clone(store);
    let writer_handle = spawn_named("store-writer", move || run_writer(writer_store, write_rx))?;

    let mut worker_handles = Vec::with_capacity(config.workers);
    for worker in 0..config.workers {
        let batch_rx = batch_rx.clone();
        let write_tx = write_tx.clone();
        let table = Arc::clone(table);
        let spends = Arc::clone(spends);
        let handle = spawn_named(
            &format!("populate-{worker}"),
            move || -> Result<(), PipelineError> {
                while let Ok(payloads) = batch_rx.recv() {
                    let batch = populate_batch(&payloads, &table, &spends)?;
                    if batch.is_empty() {
                        continue;
                    }
                    if write_tx.send(batch).is_err() {
                        return Err(PipelineError::Worker(
                            "store writer terminated before end of input".to_string(),
                        ));
                    }
                }
                Ok(())
            },
        )?;
        worker_handles.push(handle);
    }
    // Workers hold the only remaining clones; channel disconnect is the
    // end-of-input signal down the chain.
    drop(batch_rx);
    drop(write_tx);

    let loader_result = join_thread(loader_handle, "block-loader")?;
    let mut worker_results = Vec::with_capacity(worker_handles.len());
    for handle in worker_handles {
        worker_results.push(join_thread(handle, "populate worker")?);
    }
    let writer_result = join_thread(writer_handle, "store-writer")?;

    // A store failure outranks the secondary errors it causes downstream.
    writer_result.map_err(PipelineError::from)?;
    loader_result?;
    for result in worker_results {
        result?;
    }

    store.flush()?;
    spendgraph_log::log_info!("Populate phase complete ({} address ids)", table.count());
    Ok(())
}

fn start_complete<S>(
    config: ExtractorConfig,
    store: Arc<S>,
    table: Arc<AddressTable<Arc<S>>>,
    spends: Arc<SpendIndex<Arc<S>>>,
) -> Result<ArcStream<S>, PipelineError>
where
    S: KeyValueStore + 'static,
{
    spendgraph_log::log_info!(
        "Completing spend mappings with {} workers over {} files",
        config.workers,
        config.block_files.len()
    );

    let (batch_tx, batch_rx) = bounded::<Vec<Vec<u8>>>(config.batch_queue_capacity);
    let (arc_tx, arc_rx) = bounded::<(i64, i64)>(config.arc_queue_capacity);

    let loader = BlockLoader::new(
        config.block_files.clone(),
        config.network.magic(),
        batch_tx,
    );
    let loader_handle = spawn_named("block-loader", move || loader.run())?;

    let mut worker_handles = Vec::with_capacity(config.workers);
    for worker in 0..config.workers {
        let batch_rx = batch_rx.clone();
        let arc_tx = arc_tx.clone();
        let table = Arc::clone(&table);
        let spends = Arc::clone(&spends);
        let handle = spawn_named(
            &format!("complete-{worker}"),
            move || -> Result<u64, PipelineError> {
                let mut emitted = 0u64;
                while let Ok(payloads) = batch_rx.recv() {
                    match complete_batch(&payloads, &table, &spends, &arc_tx)? {
                        Some(count) => emitted += count,
                        None => break,
                    }
                }
                Ok(emitted)
            },
        )?;
        worker_handles.push(handle);
    }
    drop(batch_rx);
    drop(arc_tx);

    Ok(ArcStream {
        arcs: arc_rx,
        loader: Some(loader_handle),
        workers: worker_handles,
        store,
    })
}

/// The public arc sequence of the completing phase.
///
/// `next` blocks until an arc is available or every pass-2 worker has
/// terminated and the queue is drained, then yields `None` (and keeps
/// yielding `None`). Arc order across outpoints is unspecified; within one
/// outpoint receivers arrive sorted and deduplicated.
pub struct ArcStream<S: KeyValueStore + 'static> {
    arcs: Receiver<(i64, i64)>,
    loader: Option<thread::JoinHandle<Result<(), PipelineError>>>,
    workers: Vec<thread::JoinHandle<Result<u64, PipelineError>>>,
    store: Arc<S>,
}

impl<S: KeyValueStore + 'static> Iterator for ArcStream<S> {
    type Item = (i64, i64);

    fn next(&mut self) -> Option<(i64, i64)> {
        self.arcs.recv().ok()
    }
}

impl<S: KeyValueStore + 'static> ArcStream<S> {
    /// Join the phase and surface any loader or worker failure. Remaining
    /// arcs are drained and discarded, so this never deadlocks on a full
    /// queue.
    pub fn finish(mut self) -> Result<(), PipelineError> {
        while self.arcs.recv().is_ok() {}

        let mut emitted = 0u64;
        for handle in self.workers.drain(..) {
            emitted += join_thread(handle, "complete worker")??;
        }
        if let Some(handle) = self.loader.take() {
            join_thread(handle, "block-loader")??;
        }

        self.store.flush()?;
        spendgraph_log::log_info!("Complete phase finished ({emitted} arcs emitted)");
        Ok(())
    }
}

fn spawn_named<T, F>(name: &str, task: F) -> Result<thread::JoinHandle<T>, PipelineError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(task)
        .map_err(|err| PipelineError::Worker(format!("failed to spawn {name} thread: {err}")))
}

fn join_thread<T>(handle: thread::JoinHandle<T>, name: &str) -> Result<T, PipelineError> {
    handle
        .join()
        .map_err(|_| PipelineError::Worker(format!("{name} thread panicked")))
}
