use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::features::reconciliation::service::Reconciler;

/// Drives reconciliation passes on the configured poll interval until the
/// cancellation token fires. Passes never overlap; an overrunning pass delays
/// the next tick.
pub struct ReconciliationController {
    reconciler: Reconciler,
    cancel: CancellationToken,
}

impl ReconciliationController {
    pub fn new(reconciler: Reconciler, cancel: CancellationToken) -> Self {
        Self { reconciler, cancel }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// The first tick completes immediately, so the Store is populated at boot.
    pub async fn run(mut self) {
        let mut period = self.reconciler.store().get_settings().poll_interval();
        let mut ticker = new_ticker(Instant::now(), period);
        info!(interval_secs = period.as_secs(), "Reconciliation loop started");

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let report = self.reconciler.run_pass().await;
            debug!(
                changed = report.changed.len(),
                failed = report.failed.len(),
                auto_stopped = report.auto_stopped.len(),
                "Reconciliation pass finished"
            );

            let configured = self.reconciler.store().get_settings().poll_interval();
            if configured != period {
                info!(
                    from_secs = period.as_secs(),
                    to_secs = configured.as_secs(),
                    "Poll interval changed"
                );
                period = configured;
                let now = Instant::now();
                ticker = new_ticker(now.checked_add(period).unwrap_or(now), period);
            }
        }

        info!("Reconciliation loop stopped");
    }
}

fn new_ticker(start: Instant, period: Duration) -> Interval {
    let mut ticker = time::interval_at(start, period.max(Duration::from_secs(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}
