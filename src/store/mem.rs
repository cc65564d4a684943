//! In-memory blob store backed by DashMap.
//!
//! Used by tests and by callers that build and serve in one process.
//! All data is lost on process exit.

use dashmap::DashMap;

use crate::error::StoreError;

use super::{BlobStore, StoreResult};

/// Concurrent in-memory store using a sharded hashmap.
#[derive(Debug, Default)]
pub struct MemBlobStore {
    data: DashMap<String, Vec<u8>>,
}

impl MemBlobStore {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove a key and return its value.
    pub fn remove(&self, key: &str) -> Option<Vec<u8>> {
        self.data.remove(key).map(|(_, v)| v)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Snapshot of all keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.data.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }
}

impl BlobStore for MemBlobStore {
    fn put(&self, key: &str, bytes: &[u8]) -> StoreResult<()> {
        self.data.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        self.data
            .get(key)
            .map(|v| v.value().clone())
            .ok_or_else(|| StoreError::NotFound {
                key: key.to_string(),
            })
    }
}
