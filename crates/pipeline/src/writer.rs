//! The single writer task.
//!
//! All pass-1 mutation funnels through here: workers enqueue pre-built
//! batches and this task applies them one at a time, so the store never
//! sees concurrent batch writers and merge ops resolve race-free. The
//! channel disconnecting is the "no more batches" signal.

use crossbeam_channel::Receiver;

use spendgraph_storage::{KeyValueStore, StoreError, WriteBatch};

pub fn run_writer<S: KeyValueStore>(
    store: S,
    batches: Receiver<WriteBatch>,
) -> Result<(), StoreError> {
    let mut applied = 0u64;
    while let Ok(batch) = batches.recv() {
        // A failed batch write is fatal: the batch either fully applied or
        // not at all, and re-deriving partial state is not attempted.
        store.write_batch(&batch)?;
        applied += 1;
    }
    spendgraph_log::log_debug!("Store writer drained after {applied} batches");
    Ok(())
}
