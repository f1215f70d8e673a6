//! The token ledger facade
//!
//! [`TokenLedger`] owns one instance of every engine, all sharing the same
//! balance store, supply manager, clock and settlement queue. It is the entry
//! point for callers and the unit of persistence.

use crate::error::{EngineError, Result};
use crate::snapshot::{LedgerSnapshot, SupplyAudit, SNAPSHOT_VERSION};
use economics::{
    spawn_flush_loop, BatchProcessor, BatchReport, BurnLedger, RewardEngine, RewardRecord,
    SettlementGateway, StakingEngine, StakingPosition, SupplyManager, UnstakeOutcome,
};
use governance::{GovernanceEngine, GovernanceProposal, Tally, VoteRecord};
use ledger_core::{Amount, BalanceStore, Balances, Clock, LedgerConfig, TokenClass};
use ledger_storage::{KvStore, SnapshotStore};
use log::{error, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub struct TokenLedger {
    config: LedgerConfig,
    clock: Arc<dyn Clock>,
    balances: Arc<BalanceStore>,
    supply: Arc<SupplyManager>,
    burns: Arc<BurnLedger>,
    settlement: Arc<BatchProcessor>,
    rewards: RewardEngine,
    staking: StakingEngine,
    governance: GovernanceEngine,
}

impl TokenLedger {
    pub fn new(
        config: LedgerConfig,
        clock: Arc<dyn Clock>,
        gateway: Arc<dyn SettlementGateway>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::assemble(config, clock, gateway, BalanceStore::new()))
    }

    fn assemble(
        config: LedgerConfig,
        clock: Arc<dyn Clock>,
        gateway: Arc<dyn SettlementGateway>,
        balances: BalanceStore,
    ) -> Self {
        let balances = Arc::new(balances);
        let supply = Arc::new(SupplyManager::new(&config.tiers));
        let settlement = Arc::new(BatchProcessor::new(
            gateway,
            clock.clone(),
            config.settlement.clone(),
        ));
        let burns = Arc::new(BurnLedger::new(
            supply.clone(),
            config.tiers.clone(),
            clock.clone(),
        ));
        let rewards = RewardEngine::new(
            balances.clone(),
            supply.clone(),
            settlement.clone(),
            config.tiers.clone(),
            config.rewards.clone(),
            clock.clone(),
        );
        let staking = StakingEngine::new(
            balances.clone(),
            supply.clone(),
            burns.clone(),
            settlement.clone(),
            config.tiers.clone(),
            config.staking.clone(),
            clock.clone(),
        );
        let governance = GovernanceEngine::new(
            balances.clone(),
            config.tiers.clone(),
            config.governance.clone(),
            clock.clone(),
        );

        Self {
            config,
            clock,
            balances,
            supply,
            burns,
            settlement,
            rewards,
            staking,
            governance,
        }
    }

    /// Rebuild a ledger from a snapshot
    pub fn restore(
        config: LedgerConfig,
        clock: Arc<dyn Clock>,
        gateway: Arc<dyn SettlementGateway>,
        snapshot: LedgerSnapshot,
    ) -> Result<Self> {
        config.validate()?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(EngineError::SnapshotVersion {
                found: snapshot.version,
                expected: SNAPSHOT_VERSION,
            });
        }

        let ledger = Self::assemble(
            config,
            clock,
            gateway,
            BalanceStore::from_accounts(snapshot.accounts),
        );
        ledger.supply.restore(snapshot.supply);
        ledger.rewards.restore(snapshot.rewards);
        ledger.burns.restore(snapshot.burns);
        ledger.staking.restore(snapshot.staking);
        ledger.governance.restore(snapshot.governance);
        ledger.settlement.restore(snapshot.settlement);
        Ok(ledger)
    }

    /// Capture every engine's state. Each engine is read under its own lock,
    /// so take snapshots of a quiescent ledger; concurrent writers can leave
    /// the parts out of step with each other.
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            version: SNAPSHOT_VERSION,
            taken_at: self.clock.now(),
            accounts: self.balances.export(),
            supply: self.supply.all_stats(),
            rewards: self.rewards.snapshot(),
            burns: self.burns.snapshot(),
            staking: self.staking.snapshot(),
            governance: self.governance.snapshot(),
            settlement: self.settlement.snapshot(),
        }
    }

    pub fn save<S: KvStore>(&self, store: &SnapshotStore<S>, name: &str) -> Result<()> {
        store.save(name, &self.snapshot())?;
        Ok(())
    }

    pub fn load<S: KvStore>(
        config: LedgerConfig,
        clock: Arc<dyn Clock>,
        gateway: Arc<dyn SettlementGateway>,
        store: &SnapshotStore<S>,
        name: &str,
    ) -> Result<Self> {
        let snapshot: LedgerSnapshot = store.load(name)?;
        info!(
            "Loaded ledger snapshot '{}' taken at {} ({} accounts)",
            name,
            snapshot.taken_at,
            snapshot.accounts.len()
        );
        Self::restore(config, clock, gateway, snapshot)
    }

    /// Load `name`, or start an empty ledger if it was never saved
    pub fn load_or_new<S: KvStore>(
        config: LedgerConfig,
        clock: Arc<dyn Clock>,
        gateway: Arc<dyn SettlementGateway>,
        store: &SnapshotStore<S>,
        name: &str,
    ) -> Result<Self> {
        match store.load_optional::<LedgerSnapshot>(name)? {
            Some(snapshot) => Self::restore(config, clock, gateway, snapshot),
            None => {
                info!("No snapshot '{}', starting a fresh ledger", name);
                Self::new(config, clock, gateway)
            }
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn balance_store(&self) -> &BalanceStore {
        &self.balances
    }

    pub fn supply(&self) -> &SupplyManager {
        &self.supply
    }

    pub fn burns(&self) -> &BurnLedger {
        &self.burns
    }

    pub fn settlement(&self) -> &BatchProcessor {
        &self.settlement
    }

    pub fn rewards(&self) -> &RewardEngine {
        &self.rewards
    }

    pub fn staking(&self) -> &StakingEngine {
        &self.staking
    }

    pub fn governance(&self) -> &GovernanceEngine {
        &self.governance
    }

    pub fn get_balance(&self, account_id: &str, class: TokenClass) -> Amount {
        self.balances.get_balance(account_id, class)
    }

    pub fn balances(&self, account_id: &str) -> Balances {
        self.balances.balances(account_id)
    }

    pub fn award(
        &self,
        account_id: &str,
        value: Amount,
        class: TokenClass,
        reason: &str,
    ) -> Result<RewardRecord> {
        Ok(self.rewards.award(account_id, value, class, reason)?)
    }

    pub fn award_with_ref(
        &self,
        account_id: &str,
        value: Amount,
        class: TokenClass,
        reason: &str,
        external_ref: &str,
    ) -> Result<RewardRecord> {
        Ok(self.rewards.award_with_ref(
            account_id,
            value,
            class,
            reason,
            Some(external_ref.to_string()),
        )?)
    }

    pub fn select_token_class(&self, account_id: &str, value: Amount) -> TokenClass {
        self.rewards.select_token_class(account_id, value)
    }

    pub fn upgrade_to_premium(&self, account_id: &str) {
        self.rewards.upgrade_to_premium(account_id)
    }

    pub fn stake(
        &self,
        account_id: &str,
        class: TokenClass,
        amount: Amount,
        lock_days: u32,
    ) -> Result<StakingPosition> {
        Ok(self.staking.stake(account_id, class, amount, lock_days)?)
    }

    pub fn unstake(&self, position_id: &str, emergency: bool) -> Result<UnstakeOutcome> {
        Ok(self.staking.unstake(position_id, emergency)?)
    }

    pub fn unstake_for(
        &self,
        account_id: &str,
        position_id: &str,
        emergency: bool,
    ) -> Result<UnstakeOutcome> {
        Ok(self.staking.unstake_for(account_id, position_id, emergency)?)
    }

    pub fn create_proposal(
        &self,
        proposer: &str,
        title: &str,
        description: &str,
        options: Vec<String>,
    ) -> Result<GovernanceProposal> {
        Ok(self
            .governance
            .create_proposal(proposer, title, description, options)?)
    }

    pub fn vote(&self, account_id: &str, proposal_id: &str, option: &str) -> Result<VoteRecord> {
        Ok(self.governance.vote(account_id, proposal_id, option)?)
    }

    pub fn tally(&self, proposal_id: &str) -> Result<Tally> {
        Ok(self.governance.tally(proposal_id)?)
    }

    /// Hand queued settlement events to the gateway
    pub fn flush(&self, force: bool) -> Result<BatchReport> {
        Ok(self.settlement.process(force)?)
    }

    /// Background flush on the configured batch interval
    pub fn spawn_settlement_loop(&self) -> JoinHandle<()> {
        spawn_flush_loop(
            self.settlement.clone(),
            Duration::from_secs(self.config.settlement.batch_interval_secs),
        )
    }

    /// Check conservation and the supply bound for every class. Meant for a
    /// quiescent ledger; concurrent writers can make a passing ledger fail.
    pub fn audit(&self) -> Vec<SupplyAudit> {
        let reward_stats = self.rewards.stats();
        TokenClass::ALL
            .into_iter()
            .map(|class| {
                let supply = self.supply.stats(class);
                let audit = SupplyAudit {
                    token_class: class,
                    liquid: self.balances.total_liquid(class),
                    active_principal: self.staking.active_principal(class),
                    burned: self.burns.total_burned(class),
                    awarded: *reward_stats.total_token_awarded.get(class),
                    yield_paid: self.staking.total_yield_paid(class),
                    circulating_supply: supply.circulating_supply,
                    total_supply: supply.total_supply,
                    reserved: supply.reserved,
                };
                if !audit.is_ok() {
                    error!("Supply audit failed for {}: {:?}", class, audit);
                }
                audit
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use economics::{SettlementError, SettlementEvent, SettlementOutcome};
    use ledger_core::{ManualClock, SystemClock};
    use ledger_storage::MemoryStore;

    struct ConfirmAll;

    impl SettlementGateway for ConfirmAll {
        fn settle(
            &self,
            events: &[SettlementEvent],
        ) -> std::result::Result<Vec<SettlementOutcome>, SettlementError> {
            Ok(events
                .iter()
                .map(|e| SettlementOutcome::Confirmed {
                    event_id: e.id.clone(),
                    reference: "ok".to_string(),
                })
                .collect())
        }
    }

    fn ledger() -> TokenLedger {
        TokenLedger::new(
            LedgerConfig::default(),
            Arc::new(ManualClock::default()),
            Arc::new(ConfirmAll),
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = LedgerConfig::default();
        config.settlement.max_batch_size = 0;
        assert!(matches!(
            TokenLedger::new(config, Arc::new(SystemClock), Arc::new(ConfirmAll)),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn test_audit_passes_on_fresh_ledger() {
        let ledger = ledger();
        let audits = ledger.audit();
        assert_eq!(audits.len(), 2);
        assert!(audits.iter().all(SupplyAudit::is_ok));
    }

    #[test]
    fn test_snapshot_version_checked() {
        let ledger = ledger();
        let mut snapshot = ledger.snapshot();
        snapshot.version = 99;
        assert!(matches!(
            TokenLedger::restore(
                LedgerConfig::default(),
                Arc::new(SystemClock),
                Arc::new(ConfirmAll),
                snapshot
            ),
            Err(EngineError::SnapshotVersion { found: 99, .. })
        ));
    }

    #[test]
    fn test_load_or_new_starts_fresh() {
        let store = SnapshotStore::new(MemoryStore::new());
        let ledger = TokenLedger::load_or_new(
            LedgerConfig::default(),
            Arc::new(SystemClock),
            Arc::new(ConfirmAll),
            &store,
            "current",
        )
        .unwrap();
        assert_eq!(ledger.balance_store().account_count(), 0);
    }

    #[test]
    fn test_error_kind_passthrough() {
        let ledger = ledger();
        let err = ledger
            .stake("u1", TokenClass::Basic, Amount::from_tokens(1), 30)
            .unwrap_err();
        assert_eq!(err.kind(), ledger_core::ErrorKind::Resource);
    }
}
