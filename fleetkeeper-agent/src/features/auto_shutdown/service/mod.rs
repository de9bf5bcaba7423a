use chrono::{DateTime, Duration, Utc};
use fleetkeeper_core::AUTO_SHUTDOWN_STOP_TIMEOUT_SECS;
use tracing::info;

use crate::shared::types::{CommandRequest, ContainerSnapshot, ContainerStatus};

/// Idle-timeout shutdown decision.
pub struct AutoShutdownPolicy;

impl AutoShutdownPolicy {
    /// True when the container has been running empty for at least `delay`.
    pub fn should_stop(
        snapshot: &ContainerSnapshot,
        enabled: bool,
        delay: Duration,
        now: DateTime<Utc>,
    ) -> bool {
        if !enabled || snapshot.status() != ContainerStatus::Running || snapshot.occupancy() > 0 {
            return false;
        }

        match snapshot.idle_since() {
            Some(since) => now.signed_duration_since(since) >= delay,
            None => false,
        }
    }

    /// Stop request to enqueue for this tick, if any. Does not remember
    /// earlier requests for the same idle window.
    pub fn evaluate(
        snapshot: &ContainerSnapshot,
        enabled: bool,
        delay: Duration,
        now: DateTime<Utc>,
    ) -> Option<CommandRequest> {
        if !Self::should_stop(snapshot, enabled, delay, now) {
            return None;
        }

        let idle_seconds = snapshot
            .idle_since()
            .map(|since| now.signed_duration_since(since).num_seconds())
            .unwrap_or_default();
        info!(
            key = %snapshot.key(),
            idle_seconds,
            "Auto-stopping container (no players)"
        );

        Some(CommandRequest::stop(
            snapshot.key(),
            AUTO_SHUTDOWN_STOP_TIMEOUT_SECS,
        ))
    }
}
