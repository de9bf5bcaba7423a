use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::features::auto_shutdown::AutoShutdownPolicy;
use crate::features::command_dispatch::CommandQueue;
use crate::features::state_store::StateStore;
use crate::shared::error::RuntimeError;
use crate::shared::runtime::SnapshotSource;
use crate::shared::types::{ContainerSnapshot, ContainerStatus, IdleTimerPolicy, StatusChanged};

/// Inspect one container and derive its snapshot.
///
/// `previous` is the snapshot currently held for the key; it supplies the
/// occupancy fallback and the start of the idle window. A missing container
/// is a valid `NotFound` snapshot, every other inspect failure is an error.
pub async fn refresh_snapshot(
    source: &dyn SnapshotSource,
    key: &str,
    container_name: &str,
    previous: Option<&ContainerSnapshot>,
    idle_timer: IdleTimerPolicy,
    now: DateTime<Utc>,
) -> Result<ContainerSnapshot, RuntimeError> {
    let inspection = match source.inspect(container_name).await {
        Ok(inspection) => inspection,
        Err(error) if error.is_not_found() => {
            return Ok(ContainerSnapshot::not_found(key).with_last_checked(now));
        }
        Err(error) => return Err(error),
    };

    if !inspection.running {
        return Ok(
            ContainerSnapshot::new(key, inspection.runtime_id, ContainerStatus::Stopped, "", 0)
                .with_last_checked(now),
        );
    }

    let health = inspection.health.unwrap_or_default();
    let status = match health.as_str() {
        "starting" => ContainerStatus::Starting,
        _ => ContainerStatus::Running,
    };

    let occupancy = if status == ContainerStatus::Running {
        match source.fetch_occupancy(container_name).await {
            Ok(count) => count,
            Err(error) => {
                let kept = previous
                    .filter(|p| p.status() == ContainerStatus::Running)
                    .map(ContainerSnapshot::occupancy)
                    .unwrap_or(0);
                debug!(%key, error = %error, kept, "Occupancy fetch failed, keeping previous count");
                kept
            }
        }
    } else {
        0
    };

    let idle_since = match status {
        ContainerStatus::Running if occupancy == 0 => {
            Some(carried_idle_since(previous, idle_timer).unwrap_or(now))
        }
        ContainerStatus::Starting if idle_timer == IdleTimerPolicy::ResetOnStarting => Some(now),
        _ => None,
    };

    Ok(
        ContainerSnapshot::new(key, inspection.runtime_id, status, health, occupancy)
            .with_idle_since(idle_since)
            .with_last_checked(now),
    )
}

/// Start of the idle window that is still open from the previous snapshot.
fn carried_idle_since(
    previous: Option<&ContainerSnapshot>,
    idle_timer: IdleTimerPolicy,
) -> Option<DateTime<Utc>> {
    let previous = previous?;
    match previous.status() {
        ContainerStatus::Running => previous.idle_since(),
        ContainerStatus::Starting if idle_timer == IdleTimerPolicy::ResetOnStarting => {
            previous.idle_since()
        }
        _ => None,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub changed: Vec<String>,
    pub failed: Vec<String>,
    pub auto_stopped: Vec<String>,
    pub pruned: Vec<String>,
}

/// Owns the per-key digest map and runs reconciliation passes.
pub struct Reconciler {
    store: StateStore,
    source: Arc<dyn SnapshotSource>,
    queue: CommandQueue,
    events: mpsc::Sender<StatusChanged>,
    digests: HashMap<String, String>,
}

impl Reconciler {
    pub fn new(
        store: StateStore,
        source: Arc<dyn SnapshotSource>,
        queue: CommandQueue,
        events: mpsc::Sender<StatusChanged>,
    ) -> Self {
        Self {
            store,
            source,
            queue,
            events,
            digests: HashMap::new(),
        }
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub async fn run_pass(&mut self) -> PassReport {
        self.run_pass_at(Utc::now()).await
    }

    /// One full pass over the configured keys, evaluated as of `now`.
    pub async fn run_pass_at(&mut self, now: DateTime<Utc>) -> PassReport {
        let settings = self.store.get_settings();
        let mut report = PassReport::default();
        debug!(keys = settings.registered_containers.len(), "Starting reconciliation pass");

        for (key, container) in &settings.registered_containers {
            let previous = match self.store.get(key) {
                Some(snapshot) => snapshot,
                None => {
                    let placeholder = ContainerSnapshot::unknown(key.as_str());
                    self.store.put(key.as_str(), placeholder.clone());
                    placeholder
                }
            };

            let snapshot = match refresh_snapshot(
                self.source.as_ref(),
                key,
                &container.container_name,
                Some(&previous),
                settings.idle_timer(),
                now,
            )
            .await
            {
                Ok(snapshot) => snapshot,
                Err(error) => {
                    warn!(%key, error = %error, "Failed to refresh container state");
                    report.failed.push(key.clone());
                    continue;
                }
            };

            self.store.put(key.as_str(), snapshot.clone());

            let changed = self
                .digests
                .get(key)
                .map_or(true, |digest| snapshot.has_changed(digest));
            if changed {
                info!(%key, status = %snapshot.status(), occupancy = snapshot.occupancy(), "Container status changed");
                self.digests
                    .insert(key.clone(), snapshot.digest().to_string());
                self.notify(&snapshot);
                report.changed.push(key.clone());
            }

            if let Some(request) = AutoShutdownPolicy::evaluate(
                &snapshot,
                container.auto_shutdown,
                settings.auto_shutdown_delay(),
                now,
            ) {
                match self.queue.enqueue(request) {
                    Ok(_ticket) => report.auto_stopped.push(key.clone()),
                    Err(error) => {
                        warn!(%key, code = error.code(), error = %error, "Failed to enqueue auto-shutdown");
                    }
                }
            }
        }

        report.pruned = self.prune(|key| settings.is_configured(key));
        report
    }

    fn notify(&self, snapshot: &ContainerSnapshot) {
        let event = StatusChanged {
            key: snapshot.key().to_string(),
            status: snapshot.status(),
            digest: snapshot.digest().to_string(),
        };
        if let Err(error) = self.events.try_send(event) {
            debug!(key = %snapshot.key(), error = %error, "Dropped status change notification");
        }
    }

    fn prune(&mut self, keep: impl Fn(&str) -> bool) -> Vec<String> {
        let mut pruned: Vec<String> = self
            .store
            .get_all()
            .into_keys()
            .chain(self.digests.keys().cloned())
            .filter(|key| !keep(key.as_str()))
            .collect();
        pruned.sort();
        pruned.dedup();

        for key in &pruned {
            self.store.remove(key);
            self.digests.remove(key);
            info!(%key, "Removed container no longer in settings");
        }
        pruned
    }
}
