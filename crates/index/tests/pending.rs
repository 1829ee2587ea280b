use std::sync::Arc;

use spendgraph_index::SpendIndex;
use spendgraph_primitives::outpoint::OutPoint;
use spendgraph_storage::memory::MemoryStore;
use spendgraph_storage::{KeyValueStore, WriteBatch};

fn outpoint(fill: u8, index: u32) -> OutPoint {
    OutPoint {
        hash: [fill; 32],
        index,
    }
}

fn commit(store: &Arc<MemoryStore>, batch: WriteBatch) {
    store.write_batch(&batch).expect("commit");
}

#[test]
fn spends_accumulate_across_batches() {
    let store = Arc::new(MemoryStore::new());
    let index = SpendIndex::new(Arc::clone(&store));
    let top = outpoint(0x11, 0);

    let mut batch = WriteBatch::new();
    index.stage_spend(&mut batch, &top, &[1, 2, 3]);
    commit(&store, batch);

    // Empty input stages nothing.
    let mut batch = WriteBatch::new();
    index.stage_spend(&mut batch, &top, &[]);
    assert!(batch.is_empty());
    commit(&store, batch);

    let mut batch = WriteBatch::new();
    index.stage_spend(&mut batch, &top, &[4]);
    commit(&store, batch);

    assert_eq!(index.get(&top).expect("get"), vec![1, 2, 3, 4]);
}

#[test]
fn duplicate_receivers_are_kept_until_resolution() {
    let store = Arc::new(MemoryStore::new());
    let index = SpendIndex::new(Arc::clone(&store));
    let top = outpoint(0x22, 1);

    let mut batch = WriteBatch::new();
    index.stage_spend(&mut batch, &top, &[7, 7, 9]);
    index.stage_spend(&mut batch, &top, &[9]);
    commit(&store, batch);

    // Accumulation is append-only; deduplication happens at resolution.
    assert_eq!(index.get(&top).expect("get"), vec![7, 7, 9, 9]);
}

#[test]
fn take_removes_the_entry() {
    let store = Arc::new(MemoryStore::new());
    let index = SpendIndex::new(Arc::clone(&store));
    let top = outpoint(0x33, 2);

    let mut batch = WriteBatch::new();
    index.stage_spend(&mut batch, &top, &[5, 6]);
    commit(&store, batch);

    assert_eq!(index.take(&top).expect("take"), vec![5, 6]);
    // A duplicate trigger finds the entry already consumed.
    assert_eq!(index.take(&top).expect("second take"), Vec::<i64>::new());
    assert_eq!(index.get(&top).expect("get"), Vec::<i64>::new());
}

#[test]
fn references_accumulate_and_drain_once() {
    let store = Arc::new(MemoryStore::new());
    let index = SpendIndex::new(Arc::clone(&store));
    let txid = [0x44u8; 32];
    let top_a = outpoint(0x44, 0);
    let top_b = outpoint(0x44, 3);

    assert!(!index.has_references(&txid).expect("has"));

    let mut batch = WriteBatch::new();
    index.stage_reference(&mut batch, &txid, &top_a);
    index.stage_reference(&mut batch, &txid, &top_b);
    commit(&store, batch);

    assert!(index.has_references(&txid).expect("has"));
    let outpoints = index.take_references(&txid).expect("take refs");
    assert_eq!(outpoints, vec![top_a, top_b]);

    assert!(!index.has_references(&txid).expect("has after take"));
    assert_eq!(
        index.take_references(&txid).expect("second take"),
        Vec::<OutPoint>::new()
    );
}

#[test]
fn outpoints_with_same_hash_do_not_collide() {
    let store = Arc::new(MemoryStore::new());
    let index = SpendIndex::new(Arc::clone(&store));
    let top_0 = outpoint(0x55, 0);
    let top_1 = outpoint(0x55, 1);

    let mut batch = WriteBatch::new();
    index.stage_spend(&mut batch, &top_0, &[10]);
    index.stage_spend(&mut batch, &top_1, &[20]);
    commit(&store, batch);

    assert_eq!(index.take(&top_0).expect("take 0"), vec![10]);
    assert_eq!(index.take(&top_1).expect("take 1"), vec![20]);
}
