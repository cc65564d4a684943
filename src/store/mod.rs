//! Blob storage for build artifacts.
//!
//! A [`BlobStore`] exposes atomic `put(key, bytes)` / `get(key)`; the caller
//! owns any retry. Three backends:
//!
//! - [`MemBlobStore`]: concurrent hashmap (DashMap), lost on exit
//! - [`FsBlobStore`]: one file per key in a directory
//! - [`RedbBlobStore`]: single-table redb database, one transaction per put

pub mod durable;
pub mod fs;
pub mod mem;

pub use durable::RedbBlobStore;
pub use fs::FsBlobStore;
pub use mem::MemBlobStore;

use crate::config::{StoreConfig, StoreKind};
use crate::error::StoreError;

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Key/value blob storage.
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `key`, replacing any previous value.
    fn put(&self, key: &str, bytes: &[u8]) -> StoreResult<()>;

    /// Fetch the bytes stored under `key`; `StoreError::NotFound` if absent.
    fn get(&self, key: &str) -> StoreResult<Vec<u8>>;
}

impl<S: BlobStore + ?Sized> BlobStore for &S {
    fn put(&self, key: &str, bytes: &[u8]) -> StoreResult<()> {
        (**self).put(key, bytes)
    }

    fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        (**self).get(key)
    }
}

impl<S: BlobStore + ?Sized> BlobStore for Box<S> {
    fn put(&self, key: &str, bytes: &[u8]) -> StoreResult<()> {
        (**self).put(key, bytes)
    }

    fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        (**self).get(key)
    }
}

/// Open the store described by the `[store]` config section.
pub fn open(config: &StoreConfig) -> StoreResult<Box<dyn BlobStore>> {
    match config.kind {
        StoreKind::Fs => Ok(Box::new(FsBlobStore::open(&config.path)?)),
        StoreKind::Redb => Ok(Box::new(RedbBlobStore::open(&config.path)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(store: &dyn BlobStore) {
        store.put("triple-array", b"[]").unwrap();
        assert_eq!(store.get("triple-array").unwrap(), b"[]".to_vec());
        store.put("triple-array", b"[\"x\"]").unwrap();
        assert_eq!(store.get("triple-array").unwrap(), b"[\"x\"]".to_vec());
        assert!(matches!(
            store.get("ann-index"),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn every_backend_honours_the_contract() {
        exercise(&MemBlobStore::new());

        let dir = tempfile::TempDir::new().unwrap();
        exercise(&FsBlobStore::open(&dir.path().join("fs")).unwrap());
        exercise(&RedbBlobStore::open(&dir.path().join("redb")).unwrap());
    }

    #[test]
    fn open_from_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = open(&StoreConfig {
            kind: StoreKind::Fs,
            path: dir.path().to_path_buf(),
        })
        .unwrap();
        store.put("k", b"v").unwrap();
        assert_eq!(store.get("k").unwrap(), b"v".to_vec());
    }
}
