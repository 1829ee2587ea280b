//! Pass 2: resolve accumulated spends into arcs.

use std::collections::HashSet;

use crossbeam_channel::Sender;

use spendgraph_index::{AddressTable, SpendIndex};
use spendgraph_primitives::block::Block;
use spendgraph_storage::KeyValueStore;

use crate::error::PipelineError;
use crate::populate::output_ids;

/// Process one block batch of the second scan: each non-coinbase
/// transaction's outputs are the senders; every outpoint recorded for its
/// hash is consumed exactly once and turned into one arc per distinct
/// receiver.
///
/// Returns the number of arcs emitted, or `None` when the arc consumer has
/// gone away and the worker should stop.
pub fn complete_batch<S: KeyValueStore>(
    payloads: &[Vec<u8>],
    table: &AddressTable<S>,
    spends: &SpendIndex<S>,
    arcs: &Sender<(i64, i64)>,
) -> Result<Option<u64>, PipelineError> {
    let mut emitted = 0u64;

    for payload in payloads {
        let block = match Block::consensus_decode(payload) {
            Ok(block) => block,
            Err(err) => {
                spendgraph_log::log_warn!(
                    "Skipping undecodable block payload ({} bytes): {err}",
                    payload.len()
                );
                continue;
            }
        };

        for tx in &block.transactions {
            if tx.is_coinbase() {
                continue;
            }

            let txid = tx.txid();
            if !spends.has_references(&txid)? {
                // None of this transaction's outputs were spent within the
                // observed dataset.
                continue;
            }

            let senders = output_ids(tx, table)?;

            let mut outpoints = spends.take_references(&txid)?;
            let mut seen = HashSet::new();
            outpoints.retain(|outpoint| seen.insert(outpoint.clone()));

            for outpoint in outpoints {
                let mut receivers = spends.take(&outpoint)?;
                receivers.sort_unstable();
                receivers.dedup();
                if receivers.is_empty() {
                    continue;
                }

                let sender = match senders.get(outpoint.index as usize) {
                    Some(Some(sender)) => *sender,
                    Some(None) => {
                        // The spent output never resolved to an owner; it
                        // cannot act as a sender.
                        spendgraph_log::log_debug!(
                            "No sender identity for output {} of referenced transaction",
                            outpoint.index
                        );
                        continue;
                    }
                    None => {
                        spendgraph_log::log_warn!(
                            "Reference to output {} beyond transaction output count {}",
                            outpoint.index,
                            senders.len()
                        );
                        continue;
                    }
                };

                for receiver in receivers {
                    if arcs.send((sender, receiver)).is_err() {
                        return Ok(None);
                    }
                    emitted += 1;
                }
            }
        }
    }

    Ok(Some(emitted))
}
