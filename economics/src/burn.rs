//! Deflationary burns

use crate::pricing::convert_token_to_value;
use crate::supply::SupplyManager;
use chrono::{DateTime, Utc};
use ledger_core::{Amount, Clock, LedgerError, PerClass, Result, TierTable, TokenClass};
use log::info;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BurnRecord {
    pub id: String,
    pub token_class: TokenClass,
    pub amount: Amount,
    pub reference_value_equivalent: Amount,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnStats {
    pub total_burned: PerClass<Amount>,
    pub total_value_burned: Amount,
    pub burn_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BurnSnapshot {
    pub records: Vec<BurnRecord>,
    pub stats: BurnStats,
}

pub struct BurnLedger {
    supply: Arc<SupplyManager>,
    tiers: TierTable,
    clock: Arc<dyn Clock>,
    records: RwLock<Vec<BurnRecord>>,
    stats: Mutex<BurnStats>,
}

impl BurnLedger {
    pub fn new(supply: Arc<SupplyManager>, tiers: TierTable, clock: Arc<dyn Clock>) -> Self {
        Self {
            supply,
            tiers,
            clock,
            records: RwLock::new(Vec::new()),
            stats: Mutex::new(BurnStats::default()),
        }
    }

    /// Permanently remove `amount` from the class supply
    pub fn record_burn(&self, class: TokenClass, amount: Amount, reason: &str) -> Result<BurnRecord> {
        if amount.is_zero() {
            return Err(LedgerError::InvalidAmount("burn amount must be positive".to_string()));
        }
        let value = convert_token_to_value(self.tiers.get(class), class, amount)?;

        self.supply.burn(class, amount)?;

        let record = BurnRecord {
            id: Uuid::new_v4().to_string(),
            token_class: class,
            amount,
            reference_value_equivalent: value,
            reason: reason.to_string(),
            timestamp: self.clock.now(),
        };

        {
            let mut stats = self.stats.lock();
            let burned = stats.total_burned.get_mut(class);
            *burned = burned.saturating_add(amount);
            stats.total_value_burned = stats.total_value_burned.saturating_add(value);
            stats.burn_count += 1;
        }
        self.records.write().push(record.clone());

        info!("🔥 Burned {} {} ({})", amount, class, reason);
        Ok(record)
    }

    /// Most recent burns first
    pub fn history(&self, limit: usize) -> Vec<BurnRecord> {
        self.records.read().iter().rev().take(limit).cloned().collect()
    }

    pub fn total_burned(&self, class: TokenClass) -> Amount {
        *self.stats.lock().total_burned.get(class)
    }

    pub fn stats(&self) -> BurnStats {
        self.stats.lock().clone()
    }

    pub fn snapshot(&self) -> BurnSnapshot {
        BurnSnapshot {
            records: self.records.read().clone(),
            stats: self.stats(),
        }
    }

    pub fn restore(&self, snapshot: BurnSnapshot) {
        *self.records.write() = snapshot.records;
        *self.stats.lock() = snapshot.stats;
    }
}
