//! Token Ledger Governance Module
//!
//! Token-weighted proposals and voting. Voting power is read from the shared
//! balance store; proposals, votes and tallies live here.

pub mod engine;
pub mod error;
pub mod proposal;
pub mod voting;

pub use engine::{GovernanceEngine, GovernanceSnapshot, GovernanceStats};
pub use error::{GovernanceError, Result};
pub use proposal::{GovernanceProposal, ProposalStatus, DEFAULT_OPTIONS};
pub use voting::{voting_power, OptionTally, Tally, VoteRecord};
