//! Ledger error types

use crate::amount::Amount;
use crate::token::TokenClass;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification shared by every engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Bad input: amount, token class, option
    Validation,
    /// Operation conflicts with the current state of a record
    State,
    /// Not enough balance, supply or governance tokens
    Resource,
    /// Forbidden by tier or proposal policy
    Policy,
    /// Arithmetic overflow, storage or configuration failure
    Internal,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid token class: {0}")]
    InvalidTokenClass(String),

    #[error("Invalid conversion ratio for {class}: {ratio}")]
    InvalidConversionRatio { class: TokenClass, ratio: f64 },

    #[error("Token amount must be greater than zero")]
    ZeroOrNegativeAmount,

    #[error("Insufficient {class} balance for {account}: requested {requested}, available {available}")]
    InsufficientBalance {
        account: String,
        class: TokenClass,
        requested: Amount,
        available: Amount,
    },

    #[error("Staking is not enabled for {0}")]
    StakingDisabled(TokenClass),

    #[error("Staking position not found: {0}")]
    PositionNotFound(String),

    #[error("Staking position already closed: {0}")]
    AlreadyClosed(String),

    #[error("Lock period of position {position} ends at {unlock_time}")]
    LockNotExpired {
        position: String,
        unlock_time: DateTime<Utc>,
    },

    #[error("Burn exceeds {class} supply: requested {requested}, available {available}")]
    BurnExceedsSupply {
        class: TokenClass,
        requested: Amount,
        available: Amount,
    },

    #[error("{class} supply exhausted: requested {requested}, remaining {available}")]
    SupplyExhausted {
        class: TokenClass,
        requested: Amount,
        available: Amount,
    },

    #[error("Arithmetic overflow: {0}")]
    Overflow(String),

    #[error("Account {0} is not part of this transaction")]
    AccountNotLocked(String),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::InvalidAmount(_)
            | LedgerError::InvalidTokenClass(_)
            | LedgerError::InvalidConversionRatio { .. }
            | LedgerError::ZeroOrNegativeAmount => ErrorKind::Validation,
            LedgerError::PositionNotFound(_)
            | LedgerError::AlreadyClosed(_)
            | LedgerError::LockNotExpired { .. } => ErrorKind::State,
            LedgerError::InsufficientBalance { .. }
            | LedgerError::BurnExceedsSupply { .. }
            | LedgerError::SupplyExhausted { .. } => ErrorKind::Resource,
            LedgerError::StakingDisabled(_) => ErrorKind::Policy,
            LedgerError::Overflow(_) | LedgerError::AccountNotLocked(_) => ErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
