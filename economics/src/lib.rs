//! Token Ledger Economics Module
//!
//! Implements the token economy:
//! - Value-based rewards and class selection
//! - Supply caps, minting and burns
//! - Time-locked staking with simple or compounding yield
//! - Batched settlement of ledger events

pub mod burn;
pub mod pricing;
pub mod rewards;
pub mod settlement;
pub mod staking;
pub mod supply;

pub use burn::{BurnLedger, BurnRecord, BurnSnapshot, BurnStats};
pub use pricing::{convert_token_to_value, convert_value_to_token};
pub use rewards::{RewardEngine, RewardRecord, RewardSnapshot, RewardStats};
pub use settlement::{
    spawn_flush_loop, Allocation, BatchProcessor, BatchReport, SettlementError, SettlementEvent,
    SettlementGateway, SettlementKind, SettlementOutcome, SettlementReceipt, SettlementSnapshot,
    SettlementStats,
};
pub use staking::{
    compound_yield, daily_compound_yield, simple_yield, PositionStatus, StakingEngine,
    StakingPosition, StakingSnapshot, StakingStats, UnstakeOutcome,
};
pub use supply::{SupplyManager, SupplyStats};
