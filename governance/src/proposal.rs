//! Proposal types and management

use crate::error::{GovernanceError, Result};
use chrono::{DateTime, Duration, Utc};
use ledger_core::Amount;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Options used when a proposal is created without any
pub const DEFAULT_OPTIONS: [&str; 2] = ["Yes", "No"];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProposalStatus {
    Active,
    Closed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GovernanceProposal {
    pub id: String,
    pub title: String,
    pub description: String,
    pub proposer_account_id: String,
    pub options: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub voting_end: DateTime<Utc>,
    pub status: ProposalStatus,
    pub vote_counts: HashMap<String, u64>,
    pub weighted_vote_counts: HashMap<String, Amount>,
    pub voted_accounts: HashSet<String>,
}

impl GovernanceProposal {
    pub fn new(
        id: String,
        title: String,
        description: String,
        proposer_account_id: String,
        options: Vec<String>,
        created_at: DateTime<Utc>,
        voting_period_days: u32,
    ) -> Result<Self> {
        if title.trim().is_empty() {
            return Err(GovernanceError::InvalidProposal(
                "title must not be empty".to_string(),
            ));
        }

        let options: Vec<String> = if options.is_empty() {
            DEFAULT_OPTIONS.iter().map(|o| o.to_string()).collect()
        } else {
            options
        };

        let mut seen = HashSet::new();
        for option in &options {
            if option.trim().is_empty() {
                return Err(GovernanceError::InvalidProposal(
                    "options must not be empty".to_string(),
                ));
            }
            if !seen.insert(option.as_str()) {
                return Err(GovernanceError::InvalidProposal(format!(
                    "duplicate option '{}'",
                    option
                )));
            }
        }

        Ok(Self {
            id,
            title,
            description,
            proposer_account_id,
            vote_counts: options.iter().map(|o| (o.clone(), 0)).collect(),
            weighted_vote_counts: options.iter().map(|o| (o.clone(), Amount::ZERO)).collect(),
            options,
            created_at,
            voting_end: created_at + Duration::days(i64::from(voting_period_days)),
            status: ProposalStatus::Active,
            voted_accounts: HashSet::new(),
        })
    }

    /// Open until `voting_end` inclusive
    pub fn is_voting_open(&self, now: DateTime<Utc>) -> bool {
        self.status == ProposalStatus::Active && now <= self.voting_end
    }

    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }

    pub fn has_voted(&self, account_id: &str) -> bool {
        self.voted_accounts.contains(account_id)
    }

    /// Count one vote; callers have already validated the option and voter
    pub(crate) fn record_vote(&mut self, account_id: &str, option: &str, power: Amount) -> Result<()> {
        let weighted = self
            .weighted_vote_counts
            .get(option)
            .copied()
            .unwrap_or(Amount::ZERO)
            .checked_add(power)
            .ok_or_else(|| {
                ledger_core::LedgerError::Overflow(format!("weighted votes on {}", self.id))
            })?;

        self.weighted_vote_counts.insert(option.to_string(), weighted);
        *self.vote_counts.entry(option.to_string()).or_insert(0) += 1;
        self.voted_accounts.insert(account_id.to_string());
        Ok(())
    }
}
