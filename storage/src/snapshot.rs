//! Typed snapshots on top of a key-value store

use crate::kv::{KvStore, WriteOp};
use crate::StorageError;
use log::info;
use serde::de::DeserializeOwned;
use serde::Serialize;

const SNAPSHOT_PREFIX: &str = "snapshot:";

pub struct SnapshotStore<S: KvStore> {
    store: S,
}

impl<S: KvStore> SnapshotStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn key(name: &str) -> String {
        format!("{}{}", SNAPSHOT_PREFIX, name)
    }

    /// Save a snapshot (bincode)
    pub fn save<T: Serialize>(&self, name: &str, data: &T) -> Result<(), StorageError> {
        let bytes =
            bincode::serialize(data).map_err(|e| StorageError::SerializationError(e.to_string()))?;
        let size = bytes.len();
        self.store.put(&Self::key(name), bytes)?;
        info!("💾 Saved snapshot '{}' ({} bytes)", name, size);
        Ok(())
    }

    pub fn load<T: DeserializeOwned>(&self, name: &str) -> Result<T, StorageError> {
        let bytes = self
            .store
            .get(&Self::key(name))?
            .ok_or_else(|| StorageError::SnapshotNotFound(name.to_string()))?;
        bincode::deserialize(&bytes).map_err(|e| StorageError::SerializationError(e.to_string()))
    }

    /// `None` when no snapshot of that name exists
    pub fn load_optional<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, StorageError> {
        match self.load(name) {
            Ok(data) => Ok(Some(data)),
            Err(StorageError::SnapshotNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn has_snapshot(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.store.get(&Self::key(name))?.is_some())
    }

    pub fn list(&self) -> Result<Vec<String>, StorageError> {
        Ok(self
            .store
            .keys_with_prefix(SNAPSHOT_PREFIX)?
            .into_iter()
            .filter_map(|key| key.strip_prefix(SNAPSHOT_PREFIX).map(str::to_string))
            .collect())
    }

    pub fn delete(&self, name: &str) -> Result<(), StorageError> {
        if !self.store.remove(&Self::key(name))? {
            return Err(StorageError::SnapshotNotFound(name.to_string()));
        }
        Ok(())
    }

    /// Copy `from` to `to` in one transaction, keeping `from`
    pub fn copy(&self, from: &str, to: &str) -> Result<(), StorageError> {
        let bytes = self
            .store
            .get(&Self::key(from))?
            .ok_or_else(|| StorageError::SnapshotNotFound(from.to_string()))?;
        self.store.transaction(vec![WriteOp::Put {
            key: Self::key(to),
            value: bytes,
        }])
    }

    pub fn inner(&self) -> &S {
        &self.store
    }
}
