//! Token Ledger Core Library
//!
//! Amounts, token classes, configuration and account balances shared by the
//! economics and governance engines.

pub mod amount;
pub mod balance;
pub mod clock;
pub mod config;
pub mod error;
pub mod token;

pub use amount::{Amount, ParseAmountError, TOKEN_UNIT};
pub use balance::{Account, AccountSet, BalanceStore};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    ConfigError, GovernancePolicy, LedgerConfig, RewardPolicy, SettlementPolicy, StakingPolicy,
};
pub use error::{ErrorKind, LedgerError, Result};
pub use token::{
    Balances, GovernanceRights, PerClass, StakingTerms, TierTable, TokenClass, TokenTierConfig,
};

/// Library version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
