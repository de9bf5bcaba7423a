use fleetkeeper_core::{CommandKind, CoreError};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Failure reported by the container runtime collaborators.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("container {0} not found")]
    NotFound(String),
    #[error("runtime operation failed: {0}")]
    Operation(String),
}

impl RuntimeError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RuntimeError::NotFound(_))
    }
}

/// Why a command was refused against the current snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionRejection {
    AlreadyRunning,
    StillStarting,
    AlreadyStopped,
    NotRunning,
    PlayersOnline(u32),
}

impl fmt::Display for TransitionRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionRejection::AlreadyRunning => f.write_str("is already running."),
            TransitionRejection::StillStarting => {
                f.write_str("is currently starting. Please wait and try again.")
            }
            TransitionRejection::AlreadyStopped => f.write_str("is already stopped."),
            TransitionRejection::NotRunning => f.write_str("is not running."),
            TransitionRejection::PlayersOnline(count) => write!(
                f,
                "cannot be stopped because there are players online ({} players).",
                count
            ),
        }
    }
}

/// Outcome taxonomy for command requests. Every variant renders a reason a
/// front-end can show as-is.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Container '{key}' is not configured.")]
    NotConfigured { key: String },
    #[error("{display_name} is currently unavailable (container not found).")]
    NotFound { key: String, display_name: String },
    #[error("{display_name} {reason}")]
    InvalidTransition {
        key: String,
        display_name: String,
        reason: TransitionRejection,
    },
    #[error("Failed to {kind} {display_name}: {message}")]
    Runtime {
        key: String,
        display_name: String,
        kind: CommandKind,
        message: String,
    },
    #[error("Command queue is full. Please try again later.")]
    QueueFull,
    #[error("Command was cancelled because the agent is shutting down.")]
    Cancelled,
}

impl CommandError {
    pub fn code(&self) -> &'static str {
        match self {
            CommandError::NotConfigured { .. } => "NOT_CONFIGURED",
            CommandError::NotFound { .. } => "NOT_FOUND",
            CommandError::InvalidTransition { .. } => "INVALID_TRANSITION",
            CommandError::Runtime { .. } => "RUNTIME_ERROR",
            CommandError::QueueFull => "QUEUE_FULL",
            CommandError::Cancelled => "CANCELLED",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings file {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: CoreError,
    },
}

pub type CommandResult<T> = std::result::Result<T, CommandError>;
