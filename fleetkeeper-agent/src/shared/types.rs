pub use fleetkeeper_core::{
    CommandKind, CommandRequest, ContainerSettings, ContainerSnapshot, ContainerStatus,
    FleetSummary, IdleTimerPolicy, Settings,
};

use serde::{Deserialize, Serialize};

use crate::shared::error::CommandError;

/// Best-effort notification that a key's digest moved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChanged {
    pub key: String,
    pub status: ContainerStatus,
    pub digest: String,
}

/// A command the executor ran to completion.
#[derive(Debug, Clone, Serialize)]
pub struct CommandCompleted {
    pub request: CommandRequest,
    /// Snapshot taken right after the runtime call; `None` if that refresh failed.
    pub snapshot: Option<ContainerSnapshot>,
}

pub type CommandOutcome = Result<CommandCompleted, CommandError>;
