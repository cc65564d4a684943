//! ACID-durable blob store backed by redb.
//!
//! Every `put` is its own write transaction, so each artifact lands
//! atomically even though a set of artifacts does not.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableTable, TableDefinition};

use crate::error::StoreError;

use super::{BlobStore, StoreResult};

/// Table for artifacts (string keys → binary values).
const BLOB_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("blobs");

/// Blob store using a single redb database file.
pub struct RedbBlobStore {
    db: Arc<Database>,
}

impl RedbBlobStore {
    /// Open or create a store in the given directory.
    pub fn open(data_dir: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(data_dir).map_err(|e| StoreError::Io { source: e })?;
        let db_path = data_dir.join("trirag.redb");
        let db = Database::create(&db_path).map_err(|e| StoreError::Redb {
            message: format!("failed to open redb at {}: {e}", db_path.display()),
        })?;
        Ok(Self { db: Arc::new(db) })
    }
}

impl BlobStore for RedbBlobStore {
    fn put(&self, key: &str, bytes: &[u8]) -> StoreResult<()> {
        let txn = self.db.begin_write().map_err(|e| StoreError::Redb {
            message: format!("begin_write failed: {e}"),
        })?;
        {
            let mut table = txn.open_table(BLOB_TABLE).map_err(|e| StoreError::Redb {
                message: format!("open_table failed: {e}"),
            })?;
            table.insert(key, bytes).map_err(|e| StoreError::Redb {
                message: format!("insert failed: {e}"),
            })?;
        }
        txn.commit().map_err(|e| StoreError::Redb {
            message: format!("commit failed: {e}"),
        })?;
        Ok(())
    }

    fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        let txn = self.db.begin_read().map_err(|e| StoreError::Redb {
            message: format!("begin_read failed: {e}"),
        })?;
        let table = match txn.open_table(BLOB_TABLE) {
            Ok(table) => table,
            // Nothing has been written yet.
            Err(redb::TableError::TableDoesNotExist(_)) => {
                return Err(StoreError::NotFound {
                    key: key.to_string(),
                });
            }
            Err(e) => {
                return Err(StoreError::Redb {
                    message: format!("open_table failed: {e}"),
                });
            }
        };
        let value = table.get(key).map_err(|e| StoreError::Redb {
            message: format!("get failed: {e}"),
        })?;
        value
            .map(|guard| guard.value().to_vec())
            .ok_or_else(|| StoreError::NotFound {
                key: key.to_string(),
            })
    }
}

impl std::fmt::Debug for RedbBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbBlobStore").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_before_any_put_is_not_found() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = RedbBlobStore::open(dir.path()).unwrap();
        assert!(matches!(store.get("x"), Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn persistence_across_reopens() {
        let dir = tempfile::TempDir::new().unwrap();
        {
            let store = RedbBlobStore::open(dir.path()).unwrap();
            store.put("triple-array", b"persisted").unwrap();
        }
        let store = RedbBlobStore::open(dir.path()).unwrap();
        assert_eq!(store.get("triple-array").unwrap(), b"persisted".to_vec());
    }
}
