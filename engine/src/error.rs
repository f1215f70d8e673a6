//! Facade error type

use economics::SettlementError;
use governance::GovernanceError;
use ledger_core::{ConfigError, ErrorKind, LedgerError};
use ledger_storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Governance(#[from] GovernanceError),

    #[error(transparent)]
    Settlement(#[from] SettlementError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Unsupported snapshot version {found} (expected {expected})")]
    SnapshotVersion { found: u32, expected: u32 },
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Ledger(e) => e.kind(),
            EngineError::Governance(e) => e.kind(),
            EngineError::Settlement(_)
            | EngineError::Storage(_)
            | EngineError::Config(_)
            | EngineError::SnapshotVersion { .. } => ErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
