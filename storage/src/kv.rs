//! Key-value store abstraction

use crate::StorageError;
use parking_lot::RwLock;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    Put { key: String, value: Vec<u8> },
    Remove { key: String },
}

pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

    /// Returns whether the key existed
    fn remove(&self, key: &str) -> Result<bool, StorageError>;

    /// Apply every op or none
    fn transaction(&self, ops: Vec<WriteOp>) -> Result<(), StorageError>;

    /// Sorted keys starting with `prefix`
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.entries.write().remove(key).is_some())
    }

    fn transaction(&self, ops: Vec<WriteOp>) -> Result<(), StorageError> {
        let mut entries = self.entries.write();
        for op in ops {
            match op {
                WriteOp::Put { key, value } => {
                    entries.insert(key, value);
                }
                WriteOp::Remove { key } => {
                    entries.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        Ok(self
            .entries
            .read()
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_remove() {
        let store = MemoryStore::new();
        store.put("a", vec![1, 2]).unwrap();
        assert_eq!(store.get("a").unwrap(), Some(vec![1, 2]));
        assert!(store.remove("a").unwrap());
        assert!(!store.remove("a").unwrap());
        assert_eq!(store.get("a").unwrap(), None);
    }

    #[test]
    fn test_transaction_and_prefix_scan() {
        let store = MemoryStore::new();
        store.put("snapshot:old", vec![0]).unwrap();
        store
            .transaction(vec![
                WriteOp::Put {
                    key: "snapshot:b".to_string(),
                    value: vec![2],
                },
                WriteOp::Put {
                    key: "snapshot:a".to_string(),
                    value: vec![1],
                },
                WriteOp::Put {
                    key: "other".to_string(),
                    value: vec![3],
                },
                WriteOp::Remove {
                    key: "snapshot:old".to_string(),
                },
            ])
            .unwrap();

        assert_eq!(
            store.keys_with_prefix("snapshot:").unwrap(),
            vec!["snapshot:a", "snapshot:b"]
        );
    }
}
