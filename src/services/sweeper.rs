use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::store::{BookingStore, StoreError};

/// Periodic expiry sweep: finds PENDING transactions whose deadline has
/// passed and cancels them, releasing their seats. Each cancellation is a
/// conditional update, so a transaction confirmed in the same instant stays
/// LUNAS and is merely skipped here.
pub struct ExpirySweeper {
    store: Arc<dyn BookingStore>,
    interval: Duration,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Transitioned to DIBATALKAN this pass.
    pub expired: usize,
    /// No longer eligible by the time we got to them (confirmed or already
    /// swept concurrently).
    pub skipped: usize,
    /// Errored; picked up again next tick.
    pub failed: usize,
}

impl ExpirySweeper {
    pub fn new(store: Arc<dyn BookingStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    /// Runs for the life of the process. Sweep failures are logged and
    /// retried on the next tick, never fatal.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match self.sweep_once(Utc::now()).await {
                Ok(report) if report.expired > 0 || report.failed > 0 => {
                    info!(
                        expired = report.expired,
                        skipped = report.skipped,
                        failed = report.failed,
                        "expiry sweep finished"
                    );
                }
                Ok(_) => debug!("expiry sweep: nothing to do"),
                Err(e) => error!(error = %e, "expiry sweep scan failed, retrying next tick"),
            }
        }
    }

    pub async fn sweep_once(&self, now: DateTime<Utc>) -> Result<SweepReport, StoreError> {
        let ids = self.store.expired_pending_ids(now).await?;
        let mut report = SweepReport::default();

        for id in ids {
            match self.store.expire_if_overdue(id, now).await {
                Ok(true) => report.expired += 1,
                Ok(false) => report.skipped += 1,
                Err(e) => {
                    warn!(transaction_id = id, error = %e, "failed to expire transaction");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }
}
