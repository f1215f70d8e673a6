//! Token Ledger Engine
//!
//! Wires the balance store, reward, staking, burn, governance and settlement
//! engines into a single [`TokenLedger`] that can be snapshotted to storage.

pub mod error;
pub mod ledger;
pub mod snapshot;

pub use error::{EngineError, Result};
pub use ledger::TokenLedger;
pub use snapshot::{LedgerSnapshot, SupplyAudit, SNAPSHOT_VERSION};
