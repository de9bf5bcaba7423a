pub mod occupancy;
pub mod settings;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

pub use occupancy::{parse_player_list, FleetSummary};
pub use settings::{ContainerSettings, IdleTimerPolicy, RegularTaskSettings, Settings};

/// Stop timeout used when the idle policy shuts a server down.
pub const AUTO_SHUTDOWN_STOP_TIMEOUT_SECS: u32 = 10;

/// Stop/restart timeout applied when a request carries zero.
pub const DEFAULT_STOP_TIMEOUT_SECS: u32 = 10;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;

/// Lifecycle state of a managed container as last observed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerStatus {
    #[default]
    Unknown,
    Running,
    Starting,
    Stopped,
    NotFound,
}

impl ContainerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerStatus::Unknown => "unknown",
            ContainerStatus::Running => "running",
            ContainerStatus::Starting => "starting",
            ContainerStatus::Stopped => "stopped",
            ContainerStatus::NotFound => "not_found",
        }
    }
}

impl fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fingerprint of the observable fields of a snapshot.
///
/// Only used to detect change between passes. Each field is length-prefixed
/// before hashing so that no two distinct field tuples share an encoding.
pub fn compute_digest(key: &str, status: ContainerStatus, health: &str, occupancy: u32) -> String {
    let mut hasher = Sha256::new();
    for field in [key, status.as_str(), health] {
        hasher.update((field.len() as u64).to_le_bytes());
        hasher.update(field.as_bytes());
    }
    hasher.update(occupancy.to_le_bytes());
    let hash = hasher.finalize();
    hash[..8].iter().map(|b| format!("{:02x}", b)).collect()
}

/// Last-observed truth about one managed container.
///
/// Fields are read through accessors; every constructor recomputes the digest
/// and zeroes occupancy unless the status is `Running`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSnapshot {
    key: String,
    runtime_id: String,
    status: ContainerStatus,
    health: String,
    occupancy: u32,
    last_checked: Option<DateTime<Utc>>,
    idle_since: Option<DateTime<Utc>>,
    digest: String,
}

impl ContainerSnapshot {
    pub fn new(
        key: impl Into<String>,
        runtime_id: impl Into<String>,
        status: ContainerStatus,
        health: impl Into<String>,
        occupancy: u32,
    ) -> Self {
        let key = key.into();
        let health = health.into();
        let occupancy = if status == ContainerStatus::Running {
            occupancy
        } else {
            0
        };
        let digest = compute_digest(&key, status, &health, occupancy);

        Self {
            key,
            runtime_id: runtime_id.into(),
            status,
            health,
            occupancy,
            last_checked: None,
            idle_since: None,
            digest,
        }
    }

    /// Placeholder published the first time a key is seen, before any inspect.
    pub fn unknown(key: impl Into<String>) -> Self {
        Self::new(key, "", ContainerStatus::Unknown, "", 0)
    }

    pub fn not_found(key: impl Into<String>) -> Self {
        Self::new(key, "", ContainerStatus::NotFound, "", 0)
    }

    pub fn with_last_checked(mut self, at: DateTime<Utc>) -> Self {
        self.last_checked = Some(at);
        self
    }

    /// Sets the idle marker. Ignored unless the status can carry one.
    pub fn with_idle_since(mut self, since: Option<DateTime<Utc>>) -> Self {
        self.idle_since = match self.status {
            ContainerStatus::Running if self.occupancy == 0 => since,
            ContainerStatus::Starting => since,
            _ => None,
        };
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn runtime_id(&self) -> &str {
        &self.runtime_id
    }

    pub fn status(&self) -> ContainerStatus {
        self.status
    }

    pub fn health(&self) -> &str {
        &self.health
    }

    pub fn occupancy(&self) -> u32 {
        self.occupancy
    }

    pub fn last_checked(&self) -> Option<DateTime<Utc>> {
        self.last_checked
    }

    pub fn idle_since(&self) -> Option<DateTime<Utc>> {
        self.idle_since
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn is_running(&self) -> bool {
        self.status == ContainerStatus::Running
    }

    pub fn has_changed(&self, previous_digest: &str) -> bool {
        self.digest != previous_digest
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    Start,
    Stop,
    Restart,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::Start => "start",
            CommandKind::Stop => "stop",
            CommandKind::Restart => "restart",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator or policy request against one container key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub request_id: Uuid,
    pub kind: CommandKind,
    pub key: String,
    pub timeout_seconds: u32,
}

impl CommandRequest {
    pub fn new(kind: CommandKind, key: impl Into<String>, timeout_seconds: u32) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            kind,
            key: key.into(),
            timeout_seconds,
        }
    }

    pub fn start(key: impl Into<String>) -> Self {
        Self::new(CommandKind::Start, key, 0)
    }

    pub fn stop(key: impl Into<String>, timeout_seconds: u32) -> Self {
        Self::new(CommandKind::Stop, key, timeout_seconds)
    }

    pub fn restart(key: impl Into<String>, timeout_seconds: u32) -> Self {
        Self::new(CommandKind::Restart, key, timeout_seconds)
    }

    /// Timeout to hand to the runtime, substituting the default for zero.
    pub fn effective_timeout(&self) -> u32 {
        if self.timeout_seconds == 0 {
            DEFAULT_STOP_TIMEOUT_SECS
        } else {
            self.timeout_seconds
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_labels() {
        assert_eq!(ContainerStatus::Running.to_string(), "running");
        assert_eq!(ContainerStatus::NotFound.as_str(), "not_found");
        assert_eq!(ContainerStatus::default(), ContainerStatus::Unknown);
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&ContainerStatus::NotFound).unwrap();
        assert_eq!(json, "\"not_found\"");
    }

    #[test]
    fn test_snapshot_zeroes_occupancy_when_not_running() {
        let snapshot = ContainerSnapshot::new("survival", "abc", ContainerStatus::Stopped, "", 4);
        assert_eq!(snapshot.occupancy(), 0);

        let snapshot = ContainerSnapshot::new("survival", "abc", ContainerStatus::Running, "", 4);
        assert_eq!(snapshot.occupancy(), 4);
    }

    #[test]
    fn test_snapshot_digest_matches_fields() {
        let snapshot =
            ContainerSnapshot::new("survival", "abc", ContainerStatus::Running, "healthy", 2);
        assert_eq!(
            snapshot.digest(),
            compute_digest("survival", ContainerStatus::Running, "healthy", 2)
        );
        assert_eq!(snapshot.digest().len(), 16);
    }

    #[test]
    fn test_digest_ignores_runtime_id_and_timestamps() {
        let a = ContainerSnapshot::new("survival", "abc", ContainerStatus::Running, "", 0);
        let b = ContainerSnapshot::new("survival", "def", ContainerStatus::Running, "", 0)
            .with_last_checked(Utc::now())
            .with_idle_since(Some(Utc::now()));
        assert!(!b.has_changed(a.digest()));
    }

    #[test]
    fn test_digest_separates_fields() {
        let a = compute_digest("x-running", ContainerStatus::Running, "", 0);
        let b = compute_digest("x", ContainerStatus::Running, "running-", 0);
        assert_ne!(a, b);
    }

    #[test]
    fn test_idle_since_dropped_for_busy_or_stopped() {
        let now = Utc::now();
        let busy = ContainerSnapshot::new("s", "id", ContainerStatus::Running, "", 3)
            .with_idle_since(Some(now));
        assert!(busy.idle_since().is_none());

        let stopped = ContainerSnapshot::new("s", "id", ContainerStatus::Stopped, "", 0)
            .with_idle_since(Some(now));
        assert!(stopped.idle_since().is_none());

        let idle = ContainerSnapshot::new("s", "id", ContainerStatus::Running, "", 0)
            .with_idle_since(Some(now));
        assert_eq!(idle.idle_since(), Some(now));
    }

    #[test]
    fn test_unknown_and_not_found_constructors() {
        let unknown = ContainerSnapshot::unknown("survival");
        assert_eq!(unknown.status(), ContainerStatus::Unknown);
        assert!(unknown.last_checked().is_none());

        let missing = ContainerSnapshot::not_found("survival");
        assert_eq!(missing.status(), ContainerStatus::NotFound);
        assert!(missing.runtime_id().is_empty());
        assert_ne!(unknown.digest(), missing.digest());
    }

    #[test]
    fn test_command_request_constructors() {
        let start = CommandRequest::start("survival");
        assert_eq!(start.kind, CommandKind::Start);
        assert_eq!(start.key, "survival");

        let stop = CommandRequest::stop("survival", 0);
        assert_eq!(stop.effective_timeout(), DEFAULT_STOP_TIMEOUT_SECS);

        let restart = CommandRequest::restart("survival", 45);
        assert_eq!(restart.effective_timeout(), 45);
        assert_ne!(start.request_id, stop.request_id);
    }

    #[test]
    fn test_core_error_display() {
        let error = CoreError::InvalidSettings("interval must be > 0".to_string());
        assert!(error.to_string().contains("Invalid settings"));
    }

    mod snapshot_properties {
        use super::*;
        use proptest::prelude::*;

        fn status_strategy() -> impl Strategy<Value = ContainerStatus> {
            prop_oneof![
                Just(ContainerStatus::Unknown),
                Just(ContainerStatus::Running),
                Just(ContainerStatus::Starting),
                Just(ContainerStatus::Stopped),
                Just(ContainerStatus::NotFound),
            ]
        }

        fn health_strategy() -> impl Strategy<Value = String> {
            prop_oneof![
                Just(String::new()),
                Just("healthy".to_string()),
                Just("starting".to_string()),
                Just("unhealthy".to_string()),
            ]
        }

        proptest! {
            #[test]
            fn property_occupancy_zero_unless_running(
                key in "[a-z]{1,12}",
                status in status_strategy(),
                health in health_strategy(),
                occupancy in 0u32..500,
            ) {
                let snapshot = ContainerSnapshot::new(key, "rt", status, health, occupancy)
                    .with_idle_since(Some(Utc::now()));
                if snapshot.status() != ContainerStatus::Running {
                    prop_assert_eq!(snapshot.occupancy(), 0);
                }
            }

            #[test]
            fn property_digest_is_pure(
                key in "[a-z-]{1,12}",
                status in status_strategy(),
                health in health_strategy(),
                occupancy in 0u32..500,
            ) {
                prop_assert_eq!(
                    compute_digest(&key, status, &health, occupancy),
                    compute_digest(&key, status, &health, occupancy)
                );
            }

            #[test]
            fn property_digest_changes_with_any_field(
                key in "[a-z-]{1,12}",
                other_key in "[a-z-]{1,12}",
                status in status_strategy(),
                other_status in status_strategy(),
                health in health_strategy(),
                other_health in health_strategy(),
                occupancy in 0u32..500,
                other_occupancy in 0u32..500,
            ) {
                let base = compute_digest(&key, status, &health, occupancy);
                if key != other_key {
                    prop_assert_ne!(&base, &compute_digest(&other_key, status, &health, occupancy));
                }
                if status != other_status {
                    prop_assert_ne!(&base, &compute_digest(&key, other_status, &health, occupancy));
                }
                if health != other_health {
                    prop_assert_ne!(&base, &compute_digest(&key, status, &other_health, occupancy));
                }
                if occupancy != other_occupancy {
                    prop_assert_ne!(&base, &compute_digest(&key, status, &health, other_occupancy));
                }
            }
        }
    }
}
