//! Value-based token rewards
//!
//! A reward converts a reference value (revenue) into tokens of one class,
//! mints them and credits the recipient. Each reward also queues a revenue
//! distribution for settlement, split between the founder account and the
//! rewarded account.

use crate::pricing::convert_value_to_token;
use crate::settlement::{Allocation, BatchProcessor, SettlementKind};
use crate::supply::SupplyManager;
use chrono::{DateTime, Utc};
use ledger_core::{
    Amount, BalanceStore, Clock, LedgerError, PerClass, Result, RewardPolicy, TierTable,
    TokenClass,
};
use log::info;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardRecord {
    pub id: String,
    pub account_id: String,
    pub token_class: TokenClass,
    pub token_amount: Amount,
    pub reference_value_amount: Amount,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
    /// Caller-supplied idempotency key
    pub external_ref: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardStats {
    pub total_rewards_count: u64,
    pub total_value_awarded: Amount,
    pub total_token_awarded: PerClass<Amount>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RewardSnapshot {
    pub records: Vec<RewardRecord>,
    pub stats: RewardStats,
}

pub struct RewardEngine {
    balances: Arc<BalanceStore>,
    supply: Arc<SupplyManager>,
    settlement: Arc<BatchProcessor>,
    tiers: TierTable,
    policy: RewardPolicy,
    clock: Arc<dyn Clock>,
    records: RwLock<Vec<RewardRecord>>,
    stats: Mutex<RewardStats>,
}

impl RewardEngine {
    pub fn new(
        balances: Arc<BalanceStore>,
        supply: Arc<SupplyManager>,
        settlement: Arc<BatchProcessor>,
        tiers: TierTable,
        policy: RewardPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            balances,
            supply,
            settlement,
            tiers,
            policy,
            clock,
            records: RwLock::new(Vec::new()),
            stats: Mutex::new(RewardStats::default()),
        }
    }

    pub fn convert_value_to_token(&self, value: Amount, class: TokenClass) -> Result<Amount> {
        convert_value_to_token(self.tiers.get(class), class, value)
    }

    pub fn convert_token_to_value(&self, tokens: Amount, class: TokenClass) -> Result<Amount> {
        crate::pricing::convert_token_to_value(self.tiers.get(class), class, tokens)
    }

    pub fn award(
        &self,
        account_id: &str,
        value: Amount,
        class: TokenClass,
        reason: &str,
    ) -> Result<RewardRecord> {
        self.award_with_ref(account_id, value, class, reason, None)
    }

    /// Convert `value` to `class` tokens, mint and credit them. Not
    /// idempotent: callers that retry look up `external_ref` first.
    pub fn award_with_ref(
        &self,
        account_id: &str,
        value: Amount,
        class: TokenClass,
        reason: &str,
        external_ref: Option<String>,
    ) -> Result<RewardRecord> {
        if value.is_zero() {
            return Err(LedgerError::ZeroOrNegativeAmount);
        }
        let tokens = self.convert_value_to_token(value, class)?;
        if tokens.is_zero() {
            return Err(LedgerError::ZeroOrNegativeAmount);
        }

        let record = RewardRecord {
            id: Uuid::new_v4().to_string(),
            account_id: account_id.to_string(),
            token_class: class,
            token_amount: tokens,
            reference_value_amount: value,
            reason: reason.to_string(),
            timestamp: self.clock.now(),
            external_ref,
        };

        self.balances.transact(&[account_id], |accounts| {
            accounts.credit(account_id, class, tokens)?;
            self.supply.mint(class, tokens)?;

            {
                let mut stats = self.stats.lock();
                stats.total_rewards_count += 1;
                stats.total_value_awarded = stats.total_value_awarded.saturating_add(value);
                let awarded = stats.total_token_awarded.get_mut(class);
                *awarded = awarded.saturating_add(tokens);
            }
            self.records.write().push(record.clone());
            Ok::<_, LedgerError>(())
        })?;

        let founder_share = value.percent(self.policy.founder_share_percent);
        self.settlement.enqueue(SettlementKind::RevenueDistribution {
            reward_id: record.id.clone(),
            account_id: account_id.to_string(),
            value_amount: value,
            allocations: vec![
                Allocation {
                    account_id: self.policy.founder_account.clone(),
                    value_amount: founder_share,
                },
                Allocation {
                    account_id: account_id.to_string(),
                    value_amount: value.saturating_sub(founder_share),
                },
            ],
        });

        info!(
            "🎁 Awarded {} {} to {} for {} ({})",
            tokens,
            class.symbol(),
            account_id,
            value,
            reason
        );
        Ok(record)
    }

    /// Premium only for eligible accounts whose value exceeds the threshold
    pub fn select_token_class(&self, account_id: &str, value: Amount) -> TokenClass {
        if self.balances.is_premium_eligible(account_id) && value > self.policy.premium_threshold {
            TokenClass::Premium
        } else {
            TokenClass::Basic
        }
    }

    pub fn upgrade_to_premium(&self, account_id: &str) {
        self.balances.set_premium_eligible(account_id, true);
        info!("Account {} upgraded to {}", account_id, TokenClass::Premium.symbol());
    }

    /// Newest first, optionally for one account
    pub fn reward_history(&self, account_id: Option<&str>, limit: usize) -> Vec<RewardRecord> {
        self.records
            .read()
            .iter()
            .rev()
            .filter(|record| account_id.map_or(true, |id| record.account_id == id))
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn reward_by_external_ref(&self, external_ref: &str) -> Option<RewardRecord> {
        self.records
            .read()
            .iter()
            .find(|record| record.external_ref.as_deref() == Some(external_ref))
            .cloned()
    }

    pub fn total_awarded(&self, class: TokenClass) -> Amount {
        *self.stats.lock().total_token_awarded.get(class)
    }

    pub fn stats(&self) -> RewardStats {
        self.stats.lock().clone()
    }

    pub fn snapshot(&self) -> RewardSnapshot {
        RewardSnapshot {
            records: self.records.read().clone(),
            stats: self.stats(),
        }
    }

    pub fn restore(&self, snapshot: RewardSnapshot) {
        *self.records.write() = snapshot.records;
        *self.stats.lock() = snapshot.stats;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settlement::{SettlementError, SettlementEvent, SettlementGateway, SettlementOutcome};
    use ledger_core::{ManualClock, SettlementPolicy};

    struct NullGateway;

    impl SettlementGateway for NullGateway {
        fn settle(
            &self,
            _events: &[SettlementEvent],
        ) -> std::result::Result<Vec<SettlementOutcome>, SettlementError> {
            Ok(Vec::new())
        }
    }

    struct Fixture {
        balances: Arc<BalanceStore>,
        supply: Arc<SupplyManager>,
        settlement: Arc<BatchProcessor>,
        engine: RewardEngine,
    }

    fn fixture_with(tiers: TierTable) -> Fixture {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::default());
        let balances = Arc::new(BalanceStore::new());
        let supply = Arc::new(SupplyManager::new(&tiers));
        let settlement = Arc::new(BatchProcessor::new(
            Arc::new(NullGateway),
            clock.clone(),
            SettlementPolicy::default(),
        ));
        let engine = RewardEngine::new(
            balances.clone(),
            supply.clone(),
            settlement.clone(),
            tiers,
            RewardPolicy::default(),
            clock,
        );
        Fixture {
            balances,
            supply,
            settlement,
            engine,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(TierTable::default())
    }

    fn value(s: &str) -> Amount {
        s.parse().unwrap()
    }

    #[test]
    fn test_award_credits_converted_tokens() {
        let fx = fixture();
        let record = fx
            .engine
            .award("u1", value("0.05"), TokenClass::Basic, "subscription")
            .unwrap();

        assert_eq!(record.token_amount, Amount::from_tokens(50));
        assert_eq!(
            fx.balances.get_balance("u1", TokenClass::Basic),
            Amount::from_tokens(50)
        );
        assert_eq!(
            fx.supply.stats(TokenClass::Basic).circulating_supply,
            Amount::from_tokens(50)
        );

        let stats = fx.engine.stats();
        assert_eq!(stats.total_rewards_count, 1);
        assert_eq!(stats.total_value_awarded, value("0.05"));
        assert_eq!(stats.total_token_awarded.basic, Amount::from_tokens(50));
    }

    #[test]
    fn test_award_queues_revenue_split() {
        let fx = fixture();
        fx.engine
            .award("u1", value("1"), TokenClass::Premium, "bond fee")
            .unwrap();

        let pending = fx.settlement.pending();
        assert_eq!(pending.len(), 1);
        match &pending[0].kind {
            SettlementKind::RevenueDistribution { allocations, .. } => {
                assert_eq!(allocations[0].account_id, "founder");
                assert_eq!(allocations[0].value_amount, value("0.51"));
                assert_eq!(allocations[1].value_amount, value("0.49"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_zero_value_rejected() {
        let fx = fixture();
        assert_eq!(
            fx.engine.award("u1", Amount::ZERO, TokenClass::Basic, "none"),
            Err(LedgerError::ZeroOrNegativeAmount)
        );
        assert_eq!(fx.engine.stats().total_rewards_count, 0);
        assert_eq!(fx.settlement.pending_count(), 0);
    }

    #[test]
    fn test_exhausted_supply_leaves_balance_untouched() {
        let mut tiers = TierTable::default();
        tiers.premium.initial_supply = Amount::from_tokens(100);
        let fx = fixture_with(tiers);

        let result = fx.engine.award("u1", value("5"), TokenClass::Premium, "too much");
        assert!(matches!(result, Err(LedgerError::SupplyExhausted { .. })));
        assert_eq!(fx.balances.get_balance("u1", TokenClass::Premium), Amount::ZERO);
        assert!(fx.engine.reward_history(None, 10).is_empty());
    }

    #[test]
    fn test_select_token_class() {
        let fx = fixture();
        assert_eq!(fx.engine.select_token_class("u1", value("1")), TokenClass::Basic);

        fx.engine.upgrade_to_premium("u1");
        assert_eq!(fx.engine.select_token_class("u1", value("0.06")), TokenClass::Premium);
        assert_eq!(fx.engine.select_token_class("u1", value("0.04")), TokenClass::Basic);
    }

    #[test]
    fn test_value_at_threshold_stays_basic() {
        let fx = fixture();
        fx.engine.upgrade_to_premium("u1");

        let threshold = RewardPolicy::default().premium_threshold;
        assert_eq!(fx.engine.select_token_class("u1", threshold), TokenClass::Basic);
        assert_eq!(
            fx.engine
                .select_token_class("u1", threshold.saturating_add(Amount::from_minor(1))),
            TokenClass::Premium
        );
    }

    #[test]
    fn test_history_and_external_ref() {
        let fx = fixture();
        fx.engine
            .award_with_ref(
                "u1",
                value("0.05"),
                TokenClass::Basic,
                "a",
                Some("inv-1".to_string()),
            )
            .unwrap();
        fx.engine
            .award("u2", value("0.1"), TokenClass::Basic, "b")
            .unwrap();
        fx.engine
            .award("u1", value("0.2"), TokenClass::Basic, "c")
            .unwrap();

        let history = fx.engine.reward_history(Some("u1"), 10);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].reason, "c");
        assert_eq!(fx.engine.reward_history(None, 1)[0].reason, "c");

        let found = fx.engine.reward_by_external_ref("inv-1").unwrap();
        assert_eq!(found.reason, "a");
        assert!(fx.engine.reward_by_external_ref("inv-2").is_none());
    }
}
