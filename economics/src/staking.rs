//! Time-locked staking positions
//!
//! Staking moves principal out of the liquid balance into a position that
//! earns a yield quoted up front. Positions close exactly once: at or after
//! the unlock time with the quoted yield, or early through an emergency exit
//! that forfeits part of the principal. The forfeited penalty is partly
//! burned, and the rest is split between the treasury and the staking pool.

use crate::burn::BurnLedger;
use crate::settlement::{BatchProcessor, SettlementKind};
use crate::supply::SupplyManager;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use ledger_core::{
    Amount, BalanceStore, Clock, LedgerError, PerClass, Result, StakingPolicy, TierTable,
    TokenClass,
};
use log::{info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionStatus {
    Active,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakingPosition {
    pub id: String,
    pub account_id: String,
    pub token_class: TokenClass,
    pub principal: Amount,
    pub lock_days: u32,
    pub apr_percent: f64,
    pub start_time: DateTime<Utc>,
    pub unlock_time: DateTime<Utc>,
    pub estimated_yield: Amount,
    pub compounding: bool,
    pub status: PositionStatus,
    pub actual_yield: Option<Amount>,
    pub penalty_applied: Option<Amount>,
    pub close_time: Option<DateTime<Utc>>,
}

impl StakingPosition {
    pub fn is_active(&self) -> bool {
        self.status == PositionStatus::Active
    }

    pub fn is_unlocked(&self, now: DateTime<Utc>) -> bool {
        now >= self.unlock_time
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnstakeOutcome {
    pub position_id: String,
    pub token_class: TokenClass,
    pub returned_amount: Amount,
    pub yield_paid: Amount,
    pub penalty: Amount,
    pub burned: Amount,
    pub treasury_share: Amount,
    pub pool_share: Amount,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingStats {
    /// Principal of active positions
    pub total_staked: PerClass<Amount>,
    pub total_yield_paid: PerClass<Amount>,
    pub total_penalties: PerClass<Amount>,
    pub positions_opened: u64,
    pub positions_closed: u64,
    pub emergency_exits: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StakingSnapshot {
    pub positions: Vec<StakingPosition>,
    pub stats: StakingStats,
}

/// `p * r * d / 365`, floored to a minor unit
pub fn simple_yield(principal: Amount, apr_percent: f64, days: u32) -> Result<Amount> {
    let rate = apr_percent / 100.0;
    let minor = principal.minor() as f64 * rate * days as f64 / 365.0;
    Amount::from_minor_f64_floor(minor)
        .ok_or_else(|| LedgerError::Overflow(format!("simple yield on {}", principal)))
}

/// `p * (1 + r/365)^d - p`, floored to a minor unit
pub fn daily_compound_yield(principal: Amount, apr_percent: f64, days: u32) -> Result<Amount> {
    let rate = apr_percent / 100.0;
    let growth = (days as f64 * (rate / 365.0).ln_1p()).exp_m1();
    Amount::from_minor_f64_floor(principal.minor() as f64 * growth)
        .ok_or_else(|| LedgerError::Overflow(format!("compound yield on {}", principal)))
}

/// Daily compounding quote. For a single day the two formulas agree exactly
/// and float rounding can floor the compound one a minor unit lower, so the
/// simple quote is the floor.
pub fn compound_yield(principal: Amount, apr_percent: f64, days: u32) -> Result<Amount> {
    let compound = daily_compound_yield(principal, apr_percent, days)?;
    Ok(compound.max(simple_yield(principal, apr_percent, days)?))
}

pub struct StakingEngine {
    balances: Arc<BalanceStore>,
    supply: Arc<SupplyManager>,
    burns: Arc<BurnLedger>,
    settlement: Arc<BatchProcessor>,
    tiers: TierTable,
    policy: StakingPolicy,
    clock: Arc<dyn Clock>,
    positions: DashMap<String, StakingPosition>,
    stats: Mutex<StakingStats>,
}

impl StakingEngine {
    pub fn new(
        balances: Arc<BalanceStore>,
        supply: Arc<SupplyManager>,
        burns: Arc<BurnLedger>,
        settlement: Arc<BatchProcessor>,
        tiers: TierTable,
        policy: StakingPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            balances,
            supply,
            burns,
            settlement,
            tiers,
            policy,
            clock,
            positions: DashMap::new(),
            stats: Mutex::new(StakingStats::default()),
        }
    }

    /// Yield the tier would pay on `principal` locked for `lock_days`
    pub fn quote_yield(&self, class: TokenClass, principal: Amount, lock_days: u32) -> Result<Amount> {
        let terms = &self.tiers.get(class).staking;
        if terms.compounding {
            compound_yield(principal, terms.apr_percent, lock_days)
        } else {
            simple_yield(principal, terms.apr_percent, lock_days)
        }
    }

    /// Lock `amount` of the account's liquid balance. `lock_days` below the
    /// tier minimum is raised to it. The quoted yield is reserved against the
    /// class cap now, so paying it out at unlock cannot run out of supply.
    pub fn stake(
        &self,
        account_id: &str,
        class: TokenClass,
        amount: Amount,
        lock_days: u32,
    ) -> Result<StakingPosition> {
        if amount.is_zero() {
            return Err(LedgerError::InvalidAmount("stake amount must be positive".to_string()));
        }
        let terms = &self.tiers.get(class).staking;
        if !terms.enabled {
            return Err(LedgerError::StakingDisabled(class));
        }

        let lock_days = lock_days.max(terms.min_lock_days);
        let estimated_yield = self.quote_yield(class, amount, lock_days)?;
        let start_time = self.clock.now();

        let position = StakingPosition {
            id: Uuid::new_v4().to_string(),
            account_id: account_id.to_string(),
            token_class: class,
            principal: amount,
            lock_days,
            apr_percent: terms.apr_percent,
            start_time,
            unlock_time: start_time + Duration::days(i64::from(lock_days)),
            estimated_yield,
            compounding: terms.compounding,
            status: PositionStatus::Active,
            actual_yield: None,
            penalty_applied: None,
            close_time: None,
        };

        self.balances.transact(&[account_id], |accounts| {
            accounts.debit(account_id, class, amount)?;
            self.supply.reserve(class, estimated_yield)?;
            self.positions.insert(position.id.clone(), position.clone());

            let mut stats = self.stats.lock();
            let staked = stats.total_staked.get_mut(class);
            *staked = staked.saturating_add(amount);
            stats.positions_opened += 1;
            Ok::<_, LedgerError>(())
        })?;

        self.settlement.enqueue(SettlementKind::StakeOpened {
            position_id: position.id.clone(),
            account_id: account_id.to_string(),
            token_class: class,
            principal: amount,
        });

        info!(
            "🔒 {} staked {} {} for {} days (estimated yield {})",
            account_id, amount, class.symbol(), lock_days, estimated_yield
        );
        Ok(position)
    }

    pub fn unstake(&self, position_id: &str, emergency: bool) -> Result<UnstakeOutcome> {
        self.close_position(None, position_id, emergency)
    }

    /// Like [`StakingEngine::unstake`], but a position owned by another
    /// account reads as not found
    pub fn unstake_for(
        &self,
        account_id: &str,
        position_id: &str,
        emergency: bool,
    ) -> Result<UnstakeOutcome> {
        self.close_position(Some(account_id), position_id, emergency)
    }

    fn close_position(
        &self,
        owner: Option<&str>,
        position_id: &str,
        emergency: bool,
    ) -> Result<UnstakeOutcome> {
        let account_id = self
            .positions
            .get(position_id)
            .map(|position| position.account_id.clone())
            .filter(|account| owner.map_or(true, |owner| owner == account.as_str()))
            .ok_or_else(|| LedgerError::PositionNotFound(position_id.to_string()))?;

        let treasury = self.policy.treasury_account.as_str();
        let pool = self.policy.staking_pool_account.as_str();

        let outcome = self
            .balances
            .transact(&[account_id.as_str(), treasury, pool], |accounts| {
                let mut position = self
                    .positions
                    .get_mut(position_id)
                    .ok_or_else(|| LedgerError::PositionNotFound(position_id.to_string()))?;
                if !position.is_active() {
                    return Err(LedgerError::AlreadyClosed(position_id.to_string()));
                }

                let now = self.clock.now();
                let class = position.token_class;
                let principal = position.principal;
                let early = !position.is_unlocked(now);

                let outcome = if early {
                    if !emergency {
                        return Err(LedgerError::LockNotExpired {
                            position: position_id.to_string(),
                            unlock_time: position.unlock_time,
                        });
                    }

                    let penalty = principal.percent(self.policy.emergency_penalty_percent);
                    let returned = principal.saturating_sub(penalty);
                    let burned = penalty.percent(self.tiers.get(class).burn_rate_percent);
                    let remainder = penalty.saturating_sub(burned);
                    let treasury_share = remainder.percent(self.policy.treasury_share_percent);
                    let pool_share = remainder.saturating_sub(treasury_share);

                    for (account, share) in [
                        (account_id.as_str(), returned),
                        (treasury, treasury_share),
                        (pool, pool_share),
                    ] {
                        if !share.is_zero() {
                            accounts.credit(account, class, share)?;
                        }
                    }
                    if !burned.is_zero() {
                        self.burns.record_burn(
                            class,
                            burned,
                            &format!("emergency unstake of position {}", position_id),
                        )?;
                    }
                    self.supply.release(class, position.estimated_yield);

                    UnstakeOutcome {
                        position_id: position_id.to_string(),
                        token_class: class,
                        returned_amount: returned,
                        yield_paid: Amount::ZERO,
                        penalty,
                        burned,
                        treasury_share,
                        pool_share,
                    }
                } else {
                    let yield_paid = position.estimated_yield;
                    let returned = principal.checked_add(yield_paid).ok_or_else(|| {
                        LedgerError::Overflow(format!("payout of position {}", position_id))
                    })?;

                    accounts.credit(&account_id, class, returned)?;
                    self.supply.mint_reserved(class, yield_paid)?;

                    UnstakeOutcome {
                        position_id: position_id.to_string(),
                        token_class: class,
                        returned_amount: returned,
                        yield_paid,
                        penalty: Amount::ZERO,
                        burned: Amount::ZERO,
                        treasury_share: Amount::ZERO,
                        pool_share: Amount::ZERO,
                    }
                };

                position.status = PositionStatus::Closed;
                position.actual_yield = Some(outcome.yield_paid);
                position.penalty_applied = Some(outcome.penalty);
                position.close_time = Some(now);

                let mut stats = self.stats.lock();
                let staked = stats.total_staked.get_mut(class);
                *staked = staked.saturating_sub(principal);
                let paid = stats.total_yield_paid.get_mut(class);
                *paid = paid.saturating_add(outcome.yield_paid);
                let penalties = stats.total_penalties.get_mut(class);
                *penalties = penalties.saturating_add(outcome.penalty);
                stats.positions_closed += 1;
                if early {
                    stats.emergency_exits += 1;
                }

                Ok(outcome)
            })?;

        self.settlement.enqueue(SettlementKind::StakeClosed {
            position_id: position_id.to_string(),
            account_id: account_id.clone(),
            token_class: outcome.token_class,
            returned_amount: outcome.returned_amount,
            penalty: outcome.penalty,
        });

        if outcome.penalty.is_zero() {
            info!(
                "🔓 {} unstaked {}: returned {} (yield {})",
                account_id, position_id, outcome.returned_amount, outcome.yield_paid
            );
        } else {
            warn!(
                "⚠️ Emergency unstake of {} by {}: penalty {}, burned {}",
                position_id, account_id, outcome.penalty, outcome.burned
            );
        }
        Ok(outcome)
    }

    pub fn position(&self, position_id: &str) -> Option<StakingPosition> {
        self.positions.get(position_id).map(|p| p.value().clone())
    }

    /// Positions of one account, oldest first
    pub fn positions_for(&self, account_id: &str) -> Vec<StakingPosition> {
        let mut positions: Vec<StakingPosition> = self
            .positions
            .iter()
            .filter(|p| p.account_id == account_id)
            .map(|p| p.value().clone())
            .collect();
        positions.sort_by(|a, b| a.start_time.cmp(&b.start_time).then(a.id.cmp(&b.id)));
        positions
    }

    /// Sum of principals of active positions, recomputed from the positions
    pub fn active_principal(&self, class: TokenClass) -> Amount {
        self.positions
            .iter()
            .filter(|p| p.is_active() && p.token_class == class)
            .fold(Amount::ZERO, |total, p| total.saturating_add(p.principal))
    }

    pub fn total_yield_paid(&self, class: TokenClass) -> Amount {
        *self.stats.lock().total_yield_paid.get(class)
    }

    pub fn stats(&self) -> StakingStats {
        self.stats.lock().clone()
    }

    pub fn snapshot(&self) -> StakingSnapshot {
        let mut positions: Vec<StakingPosition> =
            self.positions.iter().map(|p| p.value().clone()).collect();
        positions.sort_by(|a, b| a.start_time.cmp(&b.start_time).then(a.id.cmp(&b.id)));
        StakingSnapshot {
            positions,
            stats: self.stats(),
        }
    }

    pub fn restore(&self, snapshot: StakingSnapshot) {
        self.positions.clear();
        for position in snapshot.positions {
            self.positions.insert(position.id.clone(), position);
        }
        *self.stats.lock() = snapshot.stats;
    }
}
