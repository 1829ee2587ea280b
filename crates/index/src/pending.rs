//! Pending spend accumulation and reverse transaction references.
//!
//! Pass 1 stages appends as merge ops inside worker write batches; the
//! single writer task serializes their application. Pass 2 consumes entries
//! with atomic retrieve-and-delete under sharded per-key locks.

use std::sync::Mutex;

use spendgraph_primitives::hash::Hash256;
use spendgraph_primitives::outpoint::OutPoint;
use spendgraph_storage::{Column, KeyValueStore, StoreError, WriteBatch};

use crate::codec::{bytes_to_long_list, long_list_to_bytes};

pub const OUTPOINT_KEY_LEN: usize = 36;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct OutPointKey([u8; OUTPOINT_KEY_LEN]);

impl OutPointKey {
    pub fn new(outpoint: &OutPoint) -> Self {
        let mut bytes = [0u8; OUTPOINT_KEY_LEN];
        bytes[..32].copy_from_slice(&outpoint.hash);
        bytes[32..].copy_from_slice(&outpoint.index.to_le_bytes());
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != OUTPOINT_KEY_LEN {
            return None;
        }
        let mut out = [0u8; OUTPOINT_KEY_LEN];
        out.copy_from_slice(bytes);
        Some(Self(out))
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_slice()
    }

    pub fn to_outpoint(self) -> OutPoint {
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&self.0[..32]);
        let index = u32::from_le_bytes(self.0[32..].try_into().expect("key length"));
        OutPoint { hash, index }
    }
}

pub fn outpoint_key_bytes(outpoint: &OutPoint) -> OutPointKey {
    OutPointKey::new(outpoint)
}

const LOCK_SHARDS: usize = 64;

pub struct SpendIndex<S> {
    store: S,
    locks: [Mutex<()>; LOCK_SHARDS],
}

impl<S> SpendIndex<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            locks: std::array::from_fn(|_| Mutex::new(())),
        }
    }

    fn shard(&self, key: &[u8]) -> &Mutex<()> {
        let index = key.first().copied().unwrap_or(0) as usize % LOCK_SHARDS;
        &self.locks[index]
    }
}

impl<S: KeyValueStore> SpendIndex<S> {
    /// Stage an append of `receivers` to the outpoint's accumulated list.
    /// An empty list is a no-op; callers filter unresolved identities before
    /// this point.
    pub fn stage_spend(&self, batch: &mut WriteBatch, outpoint: &OutPoint, receivers: &[i64]) {
        if receivers.is_empty() {
            return;
        }
        let key = outpoint_key_bytes(outpoint);
        batch.merge(
            Column::PendingSpend,
            key.as_bytes(),
            long_list_to_bytes(receivers),
        );
    }

    /// Stage `outpoint` under the hash of the transaction it belongs to.
    pub fn stage_reference(&self, batch: &mut WriteBatch, txid: &Hash256, outpoint: &OutPoint) {
        let key = outpoint_key_bytes(outpoint);
        batch.merge(Column::ReverseRef, txid, key.as_bytes());
    }

    /// Accumulated receivers for `outpoint`, in insertion order.
    pub fn get(&self, outpoint: &OutPoint) -> Result<Vec<i64>, StoreError> {
        let key = outpoint_key_bytes(outpoint);
        match self.store.get(Column::PendingSpend, key.as_bytes())? {
            Some(bytes) => decode_receivers(&bytes),
            None => Ok(Vec::new()),
        }
    }

    /// Atomically retrieve and delete the receivers accumulated for
    /// `outpoint`. A second call finds nothing.
    pub fn take(&self, outpoint: &OutPoint) -> Result<Vec<i64>, StoreError> {
        let key = outpoint_key_bytes(outpoint);
        let _guard = self.shard(key.as_bytes()).lock().expect("spend index lock");
        let bytes = match self.store.get(Column::PendingSpend, key.as_bytes())? {
            Some(bytes) => bytes,
            None => return Ok(Vec::new()),
        };
        self.store.delete(Column::PendingSpend, key.as_bytes())?;
        decode_receivers(&bytes)
    }

    pub fn has_references(&self, txid: &Hash256) -> Result<bool, StoreError> {
        Ok(self.store.get(Column::ReverseRef, txid)?.is_some())
    }

    /// Atomically retrieve and delete the outpoints of `txid` referenced by
    /// later spends.
    pub fn take_references(&self, txid: &Hash256) -> Result<Vec<OutPoint>, StoreError> {
        let _guard = self.shard(txid).lock().expect("spend index lock");
        let bytes = match self.store.get(Column::ReverseRef, txid)? {
            Some(bytes) => bytes,
            None => return Ok(Vec::new()),
        };
        self.store.delete(Column::ReverseRef, txid)?;
        decode_outpoints(&bytes)
    }
}

fn decode_receivers(bytes: &[u8]) -> Result<Vec<i64>, StoreError> {
    bytes_to_long_list(bytes).map_err(|err| StoreError::Backend(err.to_string()))
}

fn decode_outpoints(bytes: &[u8]) -> Result<Vec<OutPoint>, StoreError> {
    if bytes.len() % OUTPOINT_KEY_LEN != 0 {
        return Err(StoreError::Backend(
            "invalid reverse reference entry".to_string(),
        ));
    }
    let mut outpoints = Vec::with_capacity(bytes.len() / OUTPOINT_KEY_LEN);
    for chunk in bytes.chunks_exact(OUTPOINT_KEY_LEN) {
        let key = OutPointKey::from_slice(chunk)
            .ok_or_else(|| StoreError::Backend("invalid reverse reference entry".to_string()))?;
        outpoints.push(key.to_outpoint());
    }
    Ok(outpoints)
}
