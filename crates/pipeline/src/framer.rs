//! Magic-delimited block framing over raw dump files.
//!
//! Dump files are scanned byte by byte for the 4-byte network magic; record
//! boundaries are irregular, so no fixed offsets can be assumed. Each match
//! is followed by a 4-byte little-endian payload length and the payload
//! itself. A truncated tail record is dropped silently.

use std::fs;
use std::path::PathBuf;

use crossbeam_channel::Sender;

use crate::error::PipelineError;

/// Extract every complete magic-framed payload from `bytes`.
pub fn frame_payloads(bytes: &[u8], magic: [u8; 4]) -> Vec<Vec<u8>> {
    let mut payloads = Vec::new();
    let mut cursor = 0usize;

    loop {
        let mut matched = 0usize;
        while cursor < bytes.len() && matched < 4 {
            if bytes[cursor] == magic[matched] {
                matched += 1;
            } else if bytes[cursor] == magic[0] {
                matched = 1;
            } else {
                matched = 0;
            }
            cursor += 1;
        }
        if matched < 4 {
            return payloads;
        }

        if cursor + 4 > bytes.len() {
            return payloads;
        }
        let length = u32::from_le_bytes(
            bytes[cursor..cursor + 4]
                .try_into()
                .expect("slice length"),
        ) as usize;
        cursor += 4;

        if cursor + length > bytes.len() {
            return payloads;
        }
        payloads.push(bytes[cursor..cursor + length].to_vec());
        cursor += length;
    }
}

/// Producer side of the block-batch queue: reads each dump file in order,
/// frames its payloads, and pushes one batch per file. `send` blocks while
/// the bounded queue is full, which is the pipeline's backpressure.
pub struct BlockLoader {
    files: Vec<PathBuf>,
    magic: [u8; 4],
    batches: Sender<Vec<Vec<u8>>>,
}

impl BlockLoader {
    pub fn new(files: Vec<PathBuf>, magic: [u8; 4], batches: Sender<Vec<Vec<u8>>>) -> Self {
        Self {
            files,
            magic,
            batches,
        }
    }

    /// A file read error is fatal for the whole run; there is no
    /// partial-dataset mode.
    pub fn run(self) -> Result<(), PipelineError> {
        for path in &self.files {
            let bytes = fs::read(path).map_err(|source| PipelineError::Io {
                path: path.clone(),
                source,
            })?;
            let payloads = frame_payloads(&bytes, self.magic);
            spendgraph_log::log_info!(
                "Framed {} block payloads from {}",
                payloads.len(),
                path.display()
            );
            if payloads.is_empty() {
                continue;
            }
            if self.batches.send(payloads).is_err() {
                // All consumers are gone; nothing left to feed.
                break;
            }
        }
        Ok(())
    }
}
