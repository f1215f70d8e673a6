//! Token Ledger Storage Layer
//!
//! Ledger state stays in memory; snapshots of it are written through a
//! [`KvStore`]:
//! - [`MemoryStore`] for tests and throwaway ledgers
//! - [`SledStore`] for durable, flushed-on-write storage
//! - [`SnapshotStore`] for typed, bincode-encoded snapshots on top of either

pub mod kv;
pub mod sled_store;
pub mod snapshot;

pub use kv::{KvStore, MemoryStore, WriteOp};
pub use sled_store::SledStore;
pub use snapshot::SnapshotStore;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Transaction failed: {0}")]
    TransactionError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Snapshot not found: {0}")]
    SnapshotNotFound(String),
}
