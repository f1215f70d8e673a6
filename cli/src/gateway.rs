//! Settlement gateway used by the command-line ledger

use chrono::Utc;
use economics::{SettlementError, SettlementEvent, SettlementGateway, SettlementOutcome};
use log::info;

/// Confirms every event and logs it; there is no external system behind the CLI
pub struct LoggingGateway;

impl SettlementGateway for LoggingGateway {
    fn settle(
        &self,
        events: &[SettlementEvent],
    ) -> Result<Vec<SettlementOutcome>, SettlementError> {
        let stamp = Utc::now().format("%Y%m%d%H%M%S").to_string();
        Ok(events
            .iter()
            .enumerate()
            .map(|(n, event)| {
                info!(
                    "Settled {} event {} (attempt {})",
                    event.kind.label(),
                    event.id,
                    event.attempts
                );
                SettlementOutcome::Confirmed {
                    event_id: event.id.clone(),
                    reference: format!("local-{}-{}", stamp, n),
                }
            })
            .collect())
    }
}
