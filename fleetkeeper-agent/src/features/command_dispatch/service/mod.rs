use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::features::reconciliation::refresh_snapshot;
use crate::features::state_store::StateStore;
use crate::shared::error::{CommandError, CommandResult, RuntimeError, TransitionRejection};
use crate::shared::runtime::{RuntimeClient, SnapshotSource};
use crate::shared::types::{
    CommandCompleted, CommandKind, CommandOutcome, CommandRequest, ContainerSnapshot,
    ContainerStatus,
};

/// Runs one command request against the runtime and refreshes the Store.
pub struct CommandExecutor {
    store: StateStore,
    runtime: Arc<dyn RuntimeClient>,
    source: Arc<dyn SnapshotSource>,
}

impl CommandExecutor {
    pub fn new(
        store: StateStore,
        runtime: Arc<dyn RuntimeClient>,
        source: Arc<dyn SnapshotSource>,
    ) -> Self {
        Self {
            store,
            runtime,
            source,
        }
    }

    pub async fn execute(&self, request: &CommandRequest) -> CommandOutcome {
        let settings = self.store.get_settings();
        let key = request.key.as_str();
        let container = settings
            .container(key)
            .ok_or_else(|| CommandError::NotConfigured {
                key: key.to_string(),
            })?;
        let display_name = container.display_name.as_str();

        let current = self.store.get(key).ok_or_else(|| CommandError::NotFound {
            key: key.to_string(),
            display_name: display_name.to_string(),
        })?;
        check_preconditions(request.kind, &current, display_name)?;

        info!(
            request_id = %request.request_id,
            %key,
            kind = %request.kind,
            container = %container.container_name,
            "Executing command"
        );

        let name = container.container_name.as_str();
        let timeout = request.effective_timeout();
        let result = match request.kind {
            CommandKind::Start => self.runtime.start(name).await,
            CommandKind::Stop => self.runtime.stop(name, timeout).await,
            CommandKind::Restart => self.runtime.restart(name, timeout).await,
        };
        result.map_err(|error| match error {
            RuntimeError::NotFound(_) => CommandError::NotFound {
                key: key.to_string(),
                display_name: display_name.to_string(),
            },
            RuntimeError::Operation(message) => CommandError::Runtime {
                key: key.to_string(),
                display_name: display_name.to_string(),
                kind: request.kind,
                message,
            },
        })?;

        let snapshot = match refresh_snapshot(
            self.source.as_ref(),
            key,
            name,
            Some(&current),
            settings.idle_timer(),
            Utc::now(),
        )
        .await
        {
            Ok(snapshot) => {
                self.store.put(key, snapshot.clone());
                Some(snapshot)
            }
            Err(error) => {
                warn!(%key, error = %error, "Command succeeded but refresh failed");
                None
            }
        };

        Ok(CommandCompleted {
            request: request.clone(),
            snapshot,
        })
    }
}

/// Minimal runtime-safety checks against the current snapshot.
fn check_preconditions(
    kind: CommandKind,
    current: &ContainerSnapshot,
    display_name: &str,
) -> CommandResult<()> {
    let rejection = match (kind, current.status()) {
        (_, ContainerStatus::NotFound) => {
            return Err(CommandError::NotFound {
                key: current.key().to_string(),
                display_name: display_name.to_string(),
            });
        }
        (CommandKind::Start, ContainerStatus::Running) => TransitionRejection::AlreadyRunning,
        (CommandKind::Start, ContainerStatus::Starting) => TransitionRejection::StillStarting,
        (CommandKind::Stop, ContainerStatus::Stopped) => TransitionRejection::AlreadyStopped,
        (CommandKind::Stop, _) if current.occupancy() > 0 => {
            TransitionRejection::PlayersOnline(current.occupancy())
        }
        (CommandKind::Restart, ContainerStatus::Stopped) => TransitionRejection::NotRunning,
        _ => return Ok(()),
    };

    Err(CommandError::InvalidTransition {
        key: current.key().to_string(),
        display_name: display_name.to_string(),
        reason: rejection,
    })
}
