//! Vote records, weighting and tallies

use crate::proposal::{GovernanceProposal, ProposalStatus};
use chrono::{DateTime, Utc};
use ledger_core::{Amount, Balances, TierTable, TokenClass};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VoteRecord {
    pub id: String,
    pub proposal_id: String,
    pub account_id: String,
    pub option: String,
    pub voting_power: Amount,
    pub basic_balance: Amount,
    pub premium_balance: Amount,
    pub timestamp: DateTime<Utc>,
}

/// Liquid holdings times the tier multiplier, summed over voting tiers.
/// `None` on overflow.
pub fn voting_power(balances: &Balances, tiers: &TierTable) -> Option<Amount> {
    TokenClass::ALL
        .into_iter()
        .filter(|class| tiers.get(*class).governance.can_vote)
        .try_fold(Amount::ZERO, |power, class| {
            let multiplier = u64::from(tiers.get(class).governance.vote_weight_multiplier);
            balances.get(class).checked_mul(multiplier)?.checked_add(power)
        })
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OptionTally {
    pub option: String,
    pub votes: u64,
    pub weighted_votes: Amount,
    /// Share of all weighted votes, 0-100
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tally {
    pub proposal_id: String,
    pub title: String,
    pub status: ProposalStatus,
    pub voting_end: DateTime<Utc>,
    pub voting_active: bool,
    pub total_votes: u64,
    pub total_weighted: Amount,
    pub options: Vec<OptionTally>,
}

impl Tally {
    pub fn of(proposal: &GovernanceProposal, now: DateTime<Utc>) -> Self {
        let total_weighted = proposal
            .weighted_vote_counts
            .values()
            .fold(Amount::ZERO, |total, w| total.saturating_add(*w));
        let total_votes = proposal.vote_counts.values().sum();

        let options = proposal
            .options
            .iter()
            .map(|option| {
                let weighted_votes = proposal
                    .weighted_vote_counts
                    .get(option)
                    .copied()
                    .unwrap_or(Amount::ZERO);
                let percentage = if total_weighted.is_zero() {
                    0.0
                } else {
                    weighted_votes.minor() as f64 / total_weighted.minor() as f64 * 100.0
                };
                OptionTally {
                    option: option.clone(),
                    votes: proposal.vote_counts.get(option).copied().unwrap_or(0),
                    weighted_votes,
                    percentage,
                }
            })
            .collect();

        Self {
            proposal_id: proposal.id.clone(),
            title: proposal.title.clone(),
            status: proposal.status,
            voting_end: proposal.voting_end,
            voting_active: proposal.is_voting_open(now),
            total_votes,
            total_weighted,
            options,
        }
    }

    /// Option with the most weighted votes; `None` before any vote or on a tie
    pub fn leading_option(&self) -> Option<&OptionTally> {
        let top = self.options.iter().max_by_key(|o| o.weighted_votes)?;
        let tied = self
            .options
            .iter()
            .filter(|o| o.weighted_votes == top.weighted_votes)
            .count();
        (!top.weighted_votes.is_zero() && tied == 1).then_some(top)
    }
}
