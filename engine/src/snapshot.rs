//! Serializable ledger state and supply audits

use chrono::{DateTime, Utc};
use economics::{BurnSnapshot, RewardSnapshot, SettlementSnapshot, StakingSnapshot, SupplyStats};
use governance::GovernanceSnapshot;
use ledger_core::{Account, Amount, PerClass, TokenClass};
use serde::{Deserialize, Serialize};

pub const SNAPSHOT_VERSION: u32 = 1;

/// Everything needed to rebuild a ledger; configuration is supplied separately
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub version: u32,
    pub taken_at: DateTime<Utc>,
    pub accounts: Vec<(String, Account)>,
    pub supply: PerClass<SupplyStats>,
    pub rewards: RewardSnapshot,
    pub burns: BurnSnapshot,
    pub staking: StakingSnapshot,
    pub governance: GovernanceSnapshot,
    pub settlement: SettlementSnapshot,
}

/// Per-class consistency check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyAudit {
    pub token_class: TokenClass,
    pub liquid: Amount,
    pub active_principal: Amount,
    pub burned: Amount,
    pub awarded: Amount,
    pub yield_paid: Amount,
    pub circulating_supply: Amount,
    pub total_supply: Amount,
    /// Yield set aside for open positions
    pub reserved: Amount,
}

impl SupplyAudit {
    /// liquid + staked
    pub fn held(&self) -> Option<Amount> {
        self.liquid.checked_add(self.active_principal)
    }

    /// liquid + active principal + burned == awarded + yield paid
    pub fn is_conserved(&self) -> bool {
        let outflow = self.held().and_then(|held| held.checked_add(self.burned));
        let inflow = self.awarded.checked_add(self.yield_paid);
        outflow.is_some() && outflow == inflow
    }

    /// Held tokens match circulation, and circulation plus reservations
    /// never exceed the supply cap
    pub fn is_within_supply(&self) -> bool {
        let committed = self.circulating_supply.checked_add(self.reserved);
        self.held()
            .zip(committed)
            .map(|(held, committed)| {
                held == self.circulating_supply && committed <= self.total_supply
            })
            .unwrap_or(false)
    }

    pub fn is_ok(&self) -> bool {
        self.is_conserved() && self.is_within_supply()
    }
}
