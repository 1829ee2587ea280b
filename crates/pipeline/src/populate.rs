//! Pass 1: accumulate receiver ids and reverse references for every spend.

use spendgraph_index::{AddressTable, SpendIndex};
use spendgraph_primitives::block::Block;
use spendgraph_primitives::transaction::Transaction;
use spendgraph_script::resolve_address;
use spendgraph_storage::{KeyValueStore, StoreError, WriteBatch};

/// Resolve a transaction's outputs to address ids, preserving positions:
/// output `i` of a transaction with N outputs is always entry `i` of N,
/// `None` where the script does not reduce to a single owner.
pub fn output_ids<S: KeyValueStore>(
    tx: &Transaction,
    table: &AddressTable<S>,
) -> Result<Vec<Option<i64>>, StoreError> {
    let mut ids = Vec::with_capacity(tx.outputs.len());
    for output in &tx.outputs {
        match resolve_address(&output.script_pubkey) {
            Some(identity) => ids.push(Some(table.map(&identity)?)),
            None => ids.push(None),
        }
    }
    Ok(ids)
}

/// Process one block batch: for every non-coinbase transaction, stage its
/// receiver list under each referenced outpoint and the outpoint under the
/// referenced transaction's hash. All mutations land in one write batch for
/// the writer queue; this function never touches the store's write path.
pub fn populate_batch<S: KeyValueStore>(
    payloads: &[Vec<u8>],
    table: &AddressTable<S>,
    spends: &SpendIndex<S>,
) -> Result<WriteBatch, StoreError> {
    let mut batch = WriteBatch::new();

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

            let outputs = output_ids(tx, table)?;
            let receivers: Vec<i64> = outputs.iter().filter_map(|id| *id).collect();

            for input in &tx.inputs {
                let outpoint = &input.prevout;
                spends.stage_spend(&mut batch, outpoint, &receivers);
                spends.stage_reference(&mut batch, &outpoint.hash, outpoint);
            }
        }
    }

    Ok(batch)
}
