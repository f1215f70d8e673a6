#![allow(dead_code)]

use economics::{SettlementError, SettlementEvent, SettlementGateway, SettlementOutcome};
use ledger_core::{LedgerConfig, ManualClock};
use ledger_engine::TokenLedger;
use parking_lot::Mutex;
use std::sync::Arc;

/// Confirms every event unless switched off; records what it delivered
#[derive(Default)]
pub struct TestGateway {
    pub offline: Mutex<bool>,
    pub delivered: Mutex<Vec<String>>,
}

impl SettlementGateway for TestGateway {
    fn settle(
        &self,
        events: &[SettlementEvent],
    ) -> Result<Vec<SettlementOutcome>, SettlementError> {
        if *self.offline.lock() {
            return Err(SettlementError::Unavailable("gateway offline".to_string()));
        }
        let mut delivered = self.delivered.lock();
        Ok(events
            .iter()
            .map(|event| {
                delivered.push(event.id.clone());
                SettlementOutcome::Confirmed {
                    event_id: event.id.clone(),
                    reference: format!("tx-{}", delivered.len()),
                }
            })
            .collect())
    }
}

pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub gateway: Arc<TestGateway>,
    pub ledger: Arc<TokenLedger>,
}

pub fn harness() -> Harness {
    harness_with(LedgerConfig::default())
}

pub fn harness_with(config: LedgerConfig) -> Harness {
    let clock = Arc::new(ManualClock::default());
    let gateway = Arc::new(TestGateway::default());
    let ledger = TokenLedger::new(config, clock.clone(), gateway.clone()).unwrap();
    Harness {
        clock,
        gateway,
        ledger: Arc::new(ledger),
    }
}

pub fn value(s: &str) -> ledger_core::Amount {
    s.parse().unwrap()
}

pub fn assert_audit_ok(ledger: &TokenLedger) {
    for audit in ledger.audit() {
        assert!(audit.is_ok(), "audit failed: {:?}", audit);
    }
}
