//! Sled-backed persistence

use crate::kv::{KvStore, WriteOp};
use crate::StorageError;
use log::debug;
use sled::transaction::ConflictableTransactionResult;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct SledStore {
    db: sled::Db,
    path: PathBuf,
}

impl SledStore {
    /// Open or create the database
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(&path)
            .map_err(|e| StorageError::DatabaseError(format!("Failed to open database: {}", e)))?;
        debug!("Opened ledger database at {}", path.as_ref().display());

        Ok(Self {
            db,
            path: path.as_ref().to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StorageError> {
        self.db
            .flush()
            .map_err(|e| StorageError::DatabaseError(format!("Failed to flush to disk: {}", e)))?;
        Ok(())
    }
}

impl KvStore for SledStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.db
            .get(key.as_bytes())
            .map(|value| value.map(|v| v.to_vec()))
            .map_err(|e| StorageError::DatabaseError(format!("Failed to read {}: {}", key, e)))
    }

    fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        self.db
            .insert(key.as_bytes(), value)
            .map_err(|e| StorageError::DatabaseError(format!("Failed to write {}: {}", key, e)))?;
        self.flush()
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let existed = self
            .db
            .remove(key.as_bytes())
            .map_err(|e| StorageError::DatabaseError(format!("Failed to remove {}: {}", key, e)))?
            .is_some();
        self.flush()?;
        Ok(existed)
    }

    fn transaction(&self, ops: Vec<WriteOp>) -> Result<(), StorageError> {
        self.db
            .transaction(|tx| -> ConflictableTransactionResult<(), ()> {
                for op in &ops {
                    match op {
                        WriteOp::Put { key, value } => {
                            tx.insert(key.as_bytes(), value.as_slice())?;
                        }
                        WriteOp::Remove { key } => {
                            tx.remove(key.as_bytes())?;
                        }
                    }
                }
                Ok(())
            })
            .map_err(|e| StorageError::TransactionError(format!("{:?}", e)))?;
        self.flush()
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        self.db
            .scan_prefix(prefix.as_bytes())
            .keys()
            .map(|key| {
                key.map(|k| String::from_utf8_lossy(&k).into_owned())
                    .map_err(|e| StorageError::DatabaseError(format!("Failed to scan: {}", e)))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = SledStore::open(dir.path()).unwrap();
            store.put("snapshot:current", vec![7, 8, 9]).unwrap();
        }

        let store = SledStore::open(dir.path()).unwrap();
        assert_eq!(store.get("snapshot:current").unwrap(), Some(vec![7, 8, 9]));
    }

    #[test]
    fn test_transaction_applies_all_ops() {
        let dir = tempdir().unwrap();
        let store = SledStore::open(dir.path()).unwrap();
        store.put("k1", vec![1]).unwrap();

        store
            .transaction(vec![
                WriteOp::Remove {
                    key: "k1".to_string(),
                },
                WriteOp::Put {
                    key: "k2".to_string(),
                    value: vec![2],
                },
            ])
            .unwrap();

        assert_eq!(store.get("k1").unwrap(), None);
        assert_eq!(store.keys_with_prefix("k").unwrap(), vec!["k2"]);
        assert!(store.remove("k2").unwrap());
    }
}
