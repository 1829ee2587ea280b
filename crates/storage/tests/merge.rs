use std::sync::Arc;

use spendgraph_storage::memory::MemoryStore;
use spendgraph_storage::{Column, KeyValueStore, WriteBatch};

#[test]
fn merge_creates_then_appends() {
    let store = MemoryStore::new();

    let mut batch = WriteBatch::new();
    batch.merge(Column::PendingSpend, b"key", b"abc");
    store.write_batch(&batch).expect("commit");
    assert_eq!(
        store.get(Column::PendingSpend, b"key").expect("get"),
        Some(b"abc".to_vec())
    );

    let mut batch = WriteBatch::new();
    batch.merge(Column::PendingSpend, b"key", b"def");
    store.write_batch(&batch).expect("commit");
    assert_eq!(
        store.get(Column::PendingSpend, b"key").expect("get"),
        Some(b"abcdef".to_vec())
    );
}

#[test]
fn merge_observes_earlier_ops_in_same_batch() {
    let store = MemoryStore::new();

    let mut batch = WriteBatch::new();
    batch.merge(Column::ReverseRef, b"key", b"one");
    batch.merge(Column::ReverseRef, b"key", b"two");
    store.write_batch(&batch).expect("commit");

    assert_eq!(
        store.get(Column::ReverseRef, b"key").expect("get"),
        Some(b"onetwo".to_vec())
    );

    let mut batch = WriteBatch::new();
    batch.put(Column::ReverseRef, b"key", b"reset");
    batch.merge(Column::ReverseRef, b"key", b"!");
    store.write_batch(&batch).expect("commit");

    assert_eq!(
        store.get(Column::ReverseRef, b"key").expect("get"),
        Some(b"reset!".to_vec())
    );

    let mut batch = WriteBatch::new();
    batch.delete(Column::ReverseRef, b"key");
    batch.merge(Column::ReverseRef, b"key", b"fresh");
    store.write_batch(&batch).expect("commit");

    assert_eq!(
        store.get(Column::ReverseRef, b"key").expect("get"),
        Some(b"fresh".to_vec())
    );
}

#[test]
fn columns_are_independent_namespaces() {
    let store = Arc::new(MemoryStore::new());

    store.put(Column::AddressId, b"key", b"a").expect("put");
    store.put(Column::Meta, b"key", b"b").expect("put");

    assert_eq!(
        store.get(Column::AddressId, b"key").expect("get"),
        Some(b"a".to_vec())
    );
    assert_eq!(
        store.get(Column::Meta, b"key").expect("get"),
        Some(b"b".to_vec())
    );
    assert!(store
        .get(Column::PendingSpend, b"key")
        .expect("get")
        .is_none());
}

#[test]
fn scan_prefix_filters_by_column_and_prefix() {
    let store = MemoryStore::new();
    store.put(Column::Meta, b"prefix:1", b"a").expect("put");
    store.put(Column::Meta, b"prefix:2", b"b").expect("put");
    store.put(Column::Meta, b"other", b"c").expect("put");
    store.put(Column::AddressId, b"prefix:3", b"d").expect("put");

    let entries = store.scan_prefix(Column::Meta, b"prefix:").expect("scan");
    assert_eq!(
        entries,
        vec![
            (b"prefix:1".to_vec(), b"a".to_vec()),
            (b"prefix:2".to_vec(), b"b".to_vec()),
        ]
    );
}
