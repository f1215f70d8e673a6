use chrono::Duration;
use economics::*;
use ledger_core::{
    Amount, BalanceStore, Clock, LedgerError, ManualClock, RewardPolicy, SettlementPolicy,
    StakingPolicy, TierTable, TokenClass,
};
use proptest::prelude::*;
use std::sync::Arc;

struct RecordingGateway;

impl SettlementGateway for RecordingGateway {
    fn settle(&self, events: &[SettlementEvent]) -> Result<Vec<SettlementOutcome>, SettlementError> {
        Ok(events
            .iter()
            .map(|event| SettlementOutcome::Confirmed {
                event_id: event.id.clone(),
                reference: format!("ref-{}", event.id),
            })
            .collect())
    }
}

struct Economy {
    clock: Arc<ManualClock>,
    balances: Arc<BalanceStore>,
    supply: Arc<SupplyManager>,
    burns: Arc<BurnLedger>,
    settlement: Arc<BatchProcessor>,
    rewards: RewardEngine,
    staking: StakingEngine,
}

fn economy() -> Economy {
    let tiers = TierTable::default();
    let clock = Arc::new(ManualClock::default());
    let dyn_clock: Arc<dyn Clock> = clock.clone();
    let balances = Arc::new(BalanceStore::new());
    let supply = Arc::new(SupplyManager::new(&tiers));
    let burns = Arc::new(BurnLedger::new(supply.clone(), tiers.clone(), dyn_clock.clone()));
    let settlement = Arc::new(BatchProcessor::new(
        Arc::new(RecordingGateway),
        dyn_clock.clone(),
        SettlementPolicy::default(),
    ));
    let rewards = RewardEngine::new(
        balances.clone(),
        supply.clone(),
        settlement.clone(),
        tiers.clone(),
        RewardPolicy::default(),
        dyn_clock.clone(),
    );
    let staking = StakingEngine::new(
        balances.clone(),
        supply.clone(),
        burns.clone(),
        settlement.clone(),
        tiers,
        StakingPolicy::default(),
        dyn_clock,
    );
    Economy {
        clock,
        balances,
        supply,
        burns,
        settlement,
        rewards,
        staking,
    }
}

#[test]
fn test_mature_premium_stake_mints_compound_yield() {
    let eco = economy();
    eco.rewards
        .award("u1", Amount::from_tokens(1), TokenClass::Premium, "bond")
        .unwrap();
    let position = eco
        .staking
        .stake("u1", TokenClass::Premium, Amount::from_tokens(100), 90)
        .unwrap();
    assert!(position.compounding);
    assert_eq!(eco.balances.get_balance("u1", TokenClass::Premium), Amount::ZERO);

    eco.clock.advance(Duration::days(90));
    let outcome = eco.staking.unstake(&position.id, false).unwrap();

    let expected = compound_yield(Amount::from_tokens(100), 24.0, 90).unwrap();
    assert_eq!(outcome.yield_paid, expected);
    assert!(outcome.penalty.is_zero());

    let liquid = eco.balances.get_balance("u1", TokenClass::Premium);
    assert_eq!(liquid, Amount::from_tokens(100).checked_add(expected).unwrap());
    assert_eq!(eco.supply.stats(TokenClass::Premium).circulating_supply, liquid);
    assert_eq!(eco.staking.total_yield_paid(TokenClass::Premium), expected);
}

#[test]
fn test_emergency_exit_burns_and_splits_penalty() {
    let eco = economy();
    eco.rewards
        .award("u1", "0.2".parse().unwrap(), TokenClass::Basic, "usage")
        .unwrap();
    let position = eco
        .staking
        .stake("u1", TokenClass::Basic, Amount::from_tokens(100), 30)
        .unwrap();

    assert!(matches!(
        eco.staking.unstake(&position.id, false),
        Err(LedgerError::LockNotExpired { .. })
    ));

    let outcome = eco.staking.unstake(&position.id, true).unwrap();
    assert_eq!(outcome.returned_amount, Amount::from_tokens(50));
    assert_eq!(outcome.burned, "0.25".parse().unwrap());
    assert_eq!(eco.burns.total_burned(TokenClass::Basic), outcome.burned);

    let policy = StakingPolicy::default();
    let held = [
        eco.balances.get_balance("u1", TokenClass::Basic),
        eco.balances.get_balance(&policy.treasury_account, TokenClass::Basic),
        eco.balances.get_balance(&policy.staking_pool_account, TokenClass::Basic),
    ]
    .into_iter()
    .try_fold(Amount::ZERO, |sum, a| sum.checked_add(a))
    .unwrap();
    let supply = eco.supply.stats(TokenClass::Basic);
    assert_eq!(held, supply.circulating_supply);
    assert_eq!(
        held.checked_add(outcome.burned).unwrap(),
        Amount::from_tokens(200)
    );

    assert!(matches!(
        eco.staking.unstake(&position.id, true),
        Err(LedgerError::AlreadyClosed(_))
    ));
}

#[test]
fn test_events_flow_through_settlement() {
    let eco = economy();
    eco.rewards
        .award("u1", "0.2".parse().unwrap(), TokenClass::Basic, "usage")
        .unwrap();
    let position = eco
        .staking
        .stake("u1", TokenClass::Basic, Amount::from_tokens(50), 30)
        .unwrap();
    eco.staking.unstake(&position.id, true).unwrap();
    assert_eq!(eco.settlement.pending_count(), 3);

    let report = eco.settlement.process(true).unwrap();
    assert_eq!(report.confirmed, 3);
    assert_eq!(eco.settlement.pending_count(), 0);

    let labels: Vec<&str> = eco
        .settlement
        .receipts()
        .iter()
        .map(|receipt| receipt.kind.label())
        .collect();
    assert_eq!(labels.len(), 3);
}

proptest! {
    #[test]
    fn prop_conversion_stays_within_tier_bounds(minor in 1u64..10_000_000_000) {
        let tiers = TierTable::default();
        for class in TokenClass::ALL {
            let tier = tiers.get(class);
            let tokens = convert_value_to_token(tier, class, Amount::from_minor(minor)).unwrap();
            prop_assert!(tokens >= tier.min_amount);
            prop_assert!(tokens <= tier.max_amount);
        }
    }

    #[test]
    fn prop_simple_yield_grows_with_lock(principal in 1u64..1_000_000, days in 1u32..3650) {
        let principal = Amount::from_tokens(principal);
        let shorter = simple_yield(principal, 12.0, days).unwrap();
        let longer = simple_yield(principal, 12.0, days + 1).unwrap();
        prop_assert!(longer >= shorter);
    }
}
