//! Dense address-id assignment backed by the storage trait.

use std::sync::Mutex;

use spendgraph_script::AddressIdentity;
use spendgraph_storage::{Column, KeyValueStore, StoreError, WriteBatch};

use crate::codec::{bytes_to_long, long_to_bytes, trim};

const ADDRESS_COUNT_KEY: &[u8] = b"address_count";

/// Bijection between address identities seen so far and `[0, count)`.
///
/// The mutex scopes the read-check-reserve-write sequence so two callers
/// racing on the same new identity cannot observe different ids. This is the
/// single serialization point on the pipeline's hot path; the critical
/// section is one store read, one counter increment, one two-put batch.
pub struct AddressTable<S> {
    store: S,
    next_id: Mutex<i64>,
}

impl<S: KeyValueStore> AddressTable<S> {
    /// Open the table, restoring the id counter persisted by earlier runs.
    pub fn open(store: S) -> Result<Self, StoreError> {
        let next_id = match store.get(Column::Meta, ADDRESS_COUNT_KEY)? {
            Some(bytes) => bytes_to_long(&bytes),
            None => 0,
        };
        Ok(Self {
            store,
            next_id: Mutex::new(next_id),
        })
    }

    pub fn count(&self) -> i64 {
        *self.next_id.lock().expect("address table lock")
    }

    /// Return the id already assigned to `identity`, or assign and persist
    /// the next one.
    pub fn map(&self, identity: &AddressIdentity) -> Result<i64, StoreError> {
        let mut next_id = self.next_id.lock().expect("address table lock");

        if let Some(bytes) = self.store.get(Column::AddressId, identity.as_bytes())? {
            return Ok(bytes_to_long(&bytes));
        }

        let id = *next_id;
        let encoded = long_to_bytes(id);
        let mut batch = WriteBatch::new();
        batch.put(Column::AddressId, identity.as_bytes(), trim(&encoded));
        batch.put(Column::Meta, ADDRESS_COUNT_KEY, long_to_bytes(id + 1));
        self.store.write_batch(&batch)?;

        *next_id = id + 1;
        Ok(id)
    }
}
