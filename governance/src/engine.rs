//! Token-weighted governance
//!
//! Premium holders open proposals; any account with voting power casts one
//! vote per proposal, weighted by its liquid holdings in voting tiers. Each
//! proposal has its own lock so the already-voted check and the vote itself
//! happen atomically.

use crate::error::{GovernanceError, Result};
use crate::proposal::{GovernanceProposal, ProposalStatus};
use crate::voting::{voting_power, Tally, VoteRecord};
use dashmap::DashMap;
use ledger_core::{
    Amount, BalanceStore, Clock, GovernancePolicy, LedgerError, TierTable, TokenClass,
};
use log::{debug, info};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceStats {
    pub total_proposals: u64,
    pub active_proposals: u64,
    pub total_votes: u64,
    pub total_weighted_votes: Amount,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GovernanceSnapshot {
    pub proposals: Vec<GovernanceProposal>,
    pub votes: Vec<VoteRecord>,
}

pub struct GovernanceEngine {
    balances: Arc<BalanceStore>,
    tiers: TierTable,
    policy: GovernancePolicy,
    clock: Arc<dyn Clock>,
    proposals: DashMap<String, Arc<Mutex<GovernanceProposal>>>,
    votes: RwLock<Vec<VoteRecord>>,
}

impl GovernanceEngine {
    pub fn new(
        balances: Arc<BalanceStore>,
        tiers: TierTable,
        policy: GovernancePolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            balances,
            tiers,
            policy,
            clock,
            proposals: DashMap::new(),
            votes: RwLock::new(Vec::new()),
        }
    }

    /// Open a proposal. Empty `options` become Yes/No.
    pub fn create_proposal(
        &self,
        proposer: &str,
        title: &str,
        description: &str,
        options: Vec<String>,
    ) -> Result<GovernanceProposal> {
        let available = self.balances.get_balance(proposer, TokenClass::Premium);
        if available < self.policy.min_proposal_balance {
            return Err(GovernanceError::InsufficientGovernanceTokens {
                required: self.policy.min_proposal_balance,
                available,
            });
        }

        let proposal = GovernanceProposal::new(
            Uuid::new_v4().to_string(),
            title.to_string(),
            description.to_string(),
            proposer.to_string(),
            options,
            self.clock.now(),
            self.policy.voting_period_days,
        )?;

        self.proposals
            .insert(proposal.id.clone(), Arc::new(Mutex::new(proposal.clone())));
        info!(
            "🗳️ Proposal {} '{}' opened by {} until {}",
            proposal.id, proposal.title, proposer, proposal.voting_end
        );
        Ok(proposal)
    }

    fn handle(&self, proposal_id: &str) -> Result<Arc<Mutex<GovernanceProposal>>> {
        self.proposals
            .get(proposal_id)
            .map(|p| Arc::clone(p.value()))
            .ok_or_else(|| GovernanceError::ProposalNotFound(proposal_id.to_string()))
    }

    /// Cast `account_id`'s vote, weighted by its balances at this moment
    pub fn vote(&self, account_id: &str, proposal_id: &str, option: &str) -> Result<VoteRecord> {
        let handle = self.handle(proposal_id)?;
        let mut proposal = handle.lock();
        let now = self.clock.now();

        if !proposal.is_voting_open(now) {
            return Err(GovernanceError::VotingClosed(proposal_id.to_string()));
        }
        if proposal.has_voted(account_id) {
            return Err(GovernanceError::AlreadyVoted {
                account: account_id.to_string(),
                proposal: proposal_id.to_string(),
            });
        }
        if !proposal.has_option(option) {
            return Err(GovernanceError::InvalidOption {
                proposal: proposal_id.to_string(),
                option: option.to_string(),
            });
        }

        let balances = self.balances.balances(account_id);
        let power = voting_power(&balances, &self.tiers).ok_or_else(|| {
            LedgerError::Overflow(format!("voting power of {}", account_id))
        })?;
        if power.is_zero() {
            return Err(GovernanceError::NoVotingPower(account_id.to_string()));
        }

        proposal.record_vote(account_id, option, power)?;

        let record = VoteRecord {
            id: Uuid::new_v4().to_string(),
            proposal_id: proposal_id.to_string(),
            account_id: account_id.to_string(),
            option: option.to_string(),
            voting_power: power,
            basic_balance: balances.basic,
            premium_balance: balances.premium,
            timestamp: now,
        };
        self.votes.write().push(record.clone());

        info!(
            "{} voted '{}' on {} with power {}",
            account_id, option, proposal_id, power
        );
        Ok(record)
    }

    pub fn tally(&self, proposal_id: &str) -> Result<Tally> {
        let handle = self.handle(proposal_id)?;
        let proposal = handle.lock();
        Ok(Tally::of(&proposal, self.clock.now()))
    }

    pub fn proposal(&self, proposal_id: &str) -> Option<GovernanceProposal> {
        self.handle(proposal_id).ok().map(|p| p.lock().clone())
    }

    /// Every proposal, oldest first
    pub fn proposals(&self) -> Vec<GovernanceProposal> {
        let handles: Vec<Arc<Mutex<GovernanceProposal>>> = self
            .proposals
            .iter()
            .map(|p| Arc::clone(p.value()))
            .collect();
        let mut proposals: Vec<GovernanceProposal> =
            handles.iter().map(|p| p.lock().clone()).collect();
        proposals.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        proposals
    }

    /// Proposals still accepting votes
    pub fn active_proposals(&self) -> Vec<GovernanceProposal> {
        let now = self.clock.now();
        self.proposals()
            .into_iter()
            .filter(|p| p.is_voting_open(now))
            .collect()
    }

    /// Close every Active proposal whose voting period has ended
    pub fn close_expired(&self) -> Vec<String> {
        let now = self.clock.now();
        let handles: Vec<Arc<Mutex<GovernanceProposal>>> = self
            .proposals
            .iter()
            .map(|p| Arc::clone(p.value()))
            .collect();

        let mut closed = Vec::new();
        for handle in handles {
            let mut proposal = handle.lock();
            if proposal.status == ProposalStatus::Active && now > proposal.voting_end {
                proposal.status = ProposalStatus::Closed;
                debug!("Closed proposal {}", proposal.id);
                closed.push(proposal.id.clone());
            }
        }
        if !closed.is_empty() {
            info!("Closed {} expired proposals", closed.len());
        }
        closed
    }

    pub fn votes_for(&self, proposal_id: &str) -> Vec<VoteRecord> {
        self.votes
            .read()
            .iter()
            .filter(|v| v.proposal_id == proposal_id)
            .cloned()
            .collect()
    }

    pub fn stats(&self) -> GovernanceStats {
        let now = self.clock.now();
        let proposals = self.proposals();
        let votes = self.votes.read();
        GovernanceStats {
            total_proposals: proposals.len() as u64,
            active_proposals: proposals.iter().filter(|p| p.is_voting_open(now)).count() as u64,
            total_votes: votes.len() as u64,
            total_weighted_votes: votes
                .iter()
                .fold(Amount::ZERO, |total, v| total.saturating_add(v.voting_power)),
        }
    }

    pub fn snapshot(&self) -> GovernanceSnapshot {
        GovernanceSnapshot {
            proposals: self.proposals(),
            votes: self.votes.read().clone(),
        }
    }

    pub fn restore(&self, snapshot: GovernanceSnapshot) {
        self.proposals.clear();
        for proposal in snapshot.proposals {
            self.proposals
                .insert(proposal.id.clone(), Arc::new(Mutex::new(proposal)));
        }
        *self.votes.write() = snapshot.votes;
    }
}
