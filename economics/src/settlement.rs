//! Batched settlement hand-off
//!
//! Reward and staking engines enqueue a [`SettlementEvent`] once their ledger
//! change has committed. The [`BatchProcessor`] delivers queued events to the
//! external [`SettlementGateway`] in batches, either when the configured
//! interval has elapsed or on demand. Events the gateway does not confirm stay
//! queued, so a later flush delivers each of them exactly once.

use chrono::{DateTime, Duration, Utc};
use ledger_core::{Amount, Clock, SettlementPolicy, TokenClass};
use log::{debug, error, info, warn};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SettlementError {
    #[error("Settlement gateway unavailable: {0}")]
    Unavailable(String),

    #[error("Settlement gateway error: {0}")]
    Gateway(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub account_id: String,
    pub value_amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SettlementKind {
    RevenueDistribution {
        reward_id: String,
        account_id: String,
        value_amount: Amount,
        allocations: Vec<Allocation>,
    },
    StakeOpened {
        position_id: String,
        account_id: String,
        token_class: TokenClass,
        principal: Amount,
    },
    StakeClosed {
        position_id: String,
        account_id: String,
        token_class: TokenClass,
        returned_amount: Amount,
        penalty: Amount,
    },
}

impl SettlementKind {
    pub fn label(&self) -> &'static str {
        match self {
            SettlementKind::RevenueDistribution { .. } => "revenue_distribution",
            SettlementKind::StakeOpened { .. } => "stake_opened",
            SettlementKind::StakeClosed { .. } => "stake_closed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementEvent {
    pub id: String,
    pub kind: SettlementKind,
    pub created_at: DateTime<Utc>,
    /// Deliveries attempted so far
    pub attempts: u32,
}

/// Gateway verdict on a single event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SettlementOutcome {
    Confirmed { event_id: String, reference: String },
    Rejected { event_id: String, reason: String },
}

impl SettlementOutcome {
    pub fn event_id(&self) -> &str {
        match self {
            SettlementOutcome::Confirmed { event_id, .. }
            | SettlementOutcome::Rejected { event_id, .. } => event_id,
        }
    }
}

/// External collaborator that settles ledger events. Called with no ledger
/// lock held; may block.
pub trait SettlementGateway: Send + Sync {
    fn settle(
        &self,
        events: &[SettlementEvent],
    ) -> Result<Vec<SettlementOutcome>, SettlementError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementReceipt {
    pub event_id: String,
    pub kind: SettlementKind,
    pub reference: String,
    pub settled_at: DateTime<Utc>,
    pub attempts: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// The interval had not elapsed and the flush was not forced
    pub skipped: bool,
    pub submitted: usize,
    pub confirmed: usize,
    pub requeued: usize,
    pub pending: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementStats {
    pub total_enqueued: u64,
    pub total_confirmed: u64,
    pub total_rejected: u64,
    pub failed_batches: u64,
    pub last_flush: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementSnapshot {
    pub pending: Vec<SettlementEvent>,
    pub receipts: Vec<SettlementReceipt>,
    pub stats: SettlementStats,
}

pub struct BatchProcessor {
    gateway: Arc<dyn SettlementGateway>,
    clock: Arc<dyn Clock>,
    policy: SettlementPolicy,
    queue: Mutex<VecDeque<SettlementEvent>>,
    receipts: RwLock<Vec<SettlementReceipt>>,
    confirmed: Mutex<HashSet<String>>,
    stats: Mutex<SettlementStats>,
    // one flush at a time
    flush: Mutex<()>,
}

impl BatchProcessor {
    pub fn new(
        gateway: Arc<dyn SettlementGateway>,
        clock: Arc<dyn Clock>,
        policy: SettlementPolicy,
    ) -> Self {
        let now = clock.now();
        Self {
            gateway,
            clock,
            policy,
            queue: Mutex::new(VecDeque::new()),
            receipts: RwLock::new(Vec::new()),
            confirmed: Mutex::new(HashSet::new()),
            stats: Mutex::new(SettlementStats {
                total_enqueued: 0,
                total_confirmed: 0,
                total_rejected: 0,
                failed_batches: 0,
                last_flush: now,
            }),
            flush: Mutex::new(()),
        }
    }

    pub fn enqueue(&self, kind: SettlementKind) -> String {
        let event = SettlementEvent {
            id: Uuid::new_v4().to_string(),
            kind,
            created_at: self.clock.now(),
            attempts: 0,
        };
        let id = event.id.clone();

        debug!("Queued {} settlement event {}", event.kind.label(), id);
        self.queue.lock().push_back(event);
        self.stats.lock().total_enqueued += 1;
        id
    }

    fn is_due(&self, now: DateTime<Utc>) -> bool {
        let interval = Duration::seconds(
            i64::try_from(self.policy.batch_interval_secs).unwrap_or(i64::MAX),
        );
        now - self.stats.lock().last_flush >= interval
    }

    /// Hand one batch to the gateway. Without `force` nothing happens until
    /// the batch interval has elapsed since the last flush.
    pub fn process(&self, force: bool) -> Result<BatchReport, SettlementError> {
        let _flush = self.flush.lock();
        let now = self.clock.now();

        if !force && !self.is_due(now) {
            return Ok(BatchReport {
                skipped: true,
                pending: self.pending_count(),
                ..BatchReport::default()
            });
        }

        let mut batch: Vec<SettlementEvent> = {
            let mut queue = self.queue.lock();
            let take = queue.len().min(self.policy.max_batch_size);
            queue.drain(..take).collect()
        };
        self.stats.lock().last_flush = now;

        if batch.is_empty() {
            return Ok(BatchReport::default());
        }
        for event in batch.iter_mut() {
            event.attempts += 1;
        }

        let outcomes = match self.gateway.settle(&batch) {
            Ok(outcomes) => outcomes,
            Err(e) => {
                warn!(
                    "Settlement batch of {} events failed, requeued: {}",
                    batch.len(),
                    e
                );
                self.requeue_front(batch);
                self.stats.lock().failed_batches += 1;
                return Err(e);
            }
        };

        let verdicts: HashMap<&str, &SettlementOutcome> = outcomes
            .iter()
            .map(|outcome| (outcome.event_id(), outcome))
            .collect();

        let submitted = batch.len();
        let mut settled = Vec::new();
        let mut retry = Vec::new();
        let mut rejected = 0u64;
        {
            let mut confirmed = self.confirmed.lock();
            for event in batch.iter() {
                match verdicts.get(event.id.as_str()) {
                    Some(SettlementOutcome::Confirmed { reference, .. }) => {
                        if confirmed.insert(event.id.clone()) {
                            settled.push(SettlementReceipt {
                                event_id: event.id.clone(),
                                kind: event.kind.clone(),
                                reference: reference.clone(),
                                settled_at: now,
                                attempts: event.attempts,
                            });
                        } else {
                            debug!("Ignoring repeated confirmation of {}", event.id);
                        }
                    }
                    Some(SettlementOutcome::Rejected { reason, .. }) => {
                        warn!("Settlement event {} rejected: {}", event.id, reason);
                        rejected += 1;
                        retry.push(event.clone());
                    }
                    None => {
                        warn!("Settlement event {} not answered, requeued", event.id);
                        retry.push(event.clone());
                    }
                }
            }
        }

        let confirmed_count = settled.len();
        let requeued = retry.len();
        self.receipts.write().extend(settled);
        self.requeue_front(retry);
        {
            let mut stats = self.stats.lock();
            stats.total_confirmed += confirmed_count as u64;
            stats.total_rejected += rejected;
        }

        let report = BatchReport {
            skipped: false,
            submitted,
            confirmed: confirmed_count,
            requeued,
            pending: self.pending_count(),
        };
        info!(
            "Settlement batch: {} submitted, {} confirmed, {} requeued",
            report.submitted, report.confirmed, report.requeued
        );
        Ok(report)
    }

    fn requeue_front(&self, events: Vec<SettlementEvent>) {
        let mut queue = self.queue.lock();
        for event in events.into_iter().rev() {
            queue.push_front(event);
        }
    }

    pub fn pending(&self) -> Vec<SettlementEvent> {
        self.queue.lock().iter().cloned().collect()
    }

    pub fn pending_count(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn receipts(&self) -> Vec<SettlementReceipt> {
        self.receipts.read().clone()
    }

    pub fn stats(&self) -> SettlementStats {
        self.stats.lock().clone()
    }

    pub fn snapshot(&self) -> SettlementSnapshot {
        let _flush = self.flush.lock();
        SettlementSnapshot {
            pending: self.pending(),
            receipts: self.receipts(),
            stats: self.stats(),
        }
    }

    pub fn restore(&self, snapshot: SettlementSnapshot) {
        let _flush = self.flush.lock();
        *self.confirmed.lock() = snapshot
            .receipts
            .iter()
            .map(|receipt| receipt.event_id.clone())
            .collect();
        *self.queue.lock() = snapshot.pending.into_iter().collect();
        *self.receipts.write() = snapshot.receipts;
        *self.stats.lock() = snapshot.stats;
    }
}

/// Run `process(false)` every `period` on the tokio runtime. Gateway calls run
/// on the blocking pool.
pub fn spawn_flush_loop(processor: Arc<BatchProcessor>, period: std::time::Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);

        loop {
            interval.tick().await;

            let processor = Arc::clone(&processor);
            match tokio::task::spawn_blocking(move || processor.process(false)).await {
                Ok(Ok(report)) => {
                    if report.submitted > 0 {
                        debug!("Flush loop settled {} events", report.confirmed);
                    }
                }
                Ok(Err(e)) => warn!("Scheduled settlement flush failed: {}", e),
                Err(e) => error!("Settlement flush task aborted: {}", e),
            }
        }
    })
}
