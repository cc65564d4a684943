//! Directory-backed blob store: one file per key.
//!
//! Writes go to a temporary sibling and are renamed into place, so a reader
//! never observes a half-written blob.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::StoreError;

use super::{BlobStore, StoreResult};

/// Blob store rooted at a directory.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(root).map_err(|e| StoreError::Io { source: e })?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys are artifact names; flatten anything path-like.
        self.root.join(key.replace(['/', '\\'], "_"))
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, key: &str, bytes: &[u8]) -> StoreResult<()> {
        let target = self.path_for(key);
        let tmp = target.with_extension("tmp");
        let mut file = std::fs::File::create(&tmp).map_err(|e| StoreError::Io { source: e })?;
        file.write_all(bytes)
            .and_then(|_| file.sync_all())
            .map_err(|e| StoreError::Io { source: e })?;
        std::fs::rename(&tmp, &target).map_err(|e| StoreError::Io { source: e })?;
        Ok(())
    }

    fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        std::fs::read(self.path_for(key)).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StoreError::NotFound {
                key: key.to_string(),
            },
            _ => StoreError::Io { source: e },
        })
    }
}
