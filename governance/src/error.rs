//! Governance error types

use ledger_core::{Amount, ErrorKind, LedgerError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GovernanceError {
    #[error("Invalid proposal: {0}")]
    InvalidProposal(String),

    #[error("Insufficient governance tokens: required {required}, available {available}")]
    InsufficientGovernanceTokens { required: Amount, available: Amount },

    #[error("Proposal not found: {0}")]
    ProposalNotFound(String),

    #[error("Voting closed for proposal {0}")]
    VotingClosed(String),

    #[error("{account} already voted on proposal {proposal}")]
    AlreadyVoted { account: String, proposal: String },

    #[error("Invalid option '{option}' for proposal {proposal}")]
    InvalidOption { proposal: String, option: String },

    #[error("No voting power: {0}")]
    NoVotingPower(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl GovernanceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GovernanceError::InvalidProposal(_) | GovernanceError::InvalidOption { .. } => {
                ErrorKind::Validation
            }
            GovernanceError::ProposalNotFound(_) | GovernanceError::AlreadyVoted { .. } => {
                ErrorKind::State
            }
            GovernanceError::VotingClosed(_) => ErrorKind::Policy,
            GovernanceError::InsufficientGovernanceTokens { .. }
            | GovernanceError::NoVotingPower(_) => ErrorKind::Resource,
            GovernanceError::Ledger(e) => e.kind(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GovernanceError>;
