//! Settings model shared by the supervisor and its collaborators.
//!
//! A `Settings` value is never mutated once published; reloads build a new
//! value and swap it in whole.

use crate::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

const DEFAULT_QUEUE_CAPACITY: usize = 10;
const DEFAULT_COMMAND_TIMEOUT_SECS: u32 = 30;

/// Longest accepted poll interval (one day).
pub const MAX_INTERVAL_SECS: u64 = 86_400;
/// Longest accepted auto-shutdown delay (thirty days).
pub const MAX_AUTO_SHUTDOWN_DELAY_SECS: u64 = 30 * 86_400;

/// How the idle marker behaves while a server is still coming up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdleTimerPolicy {
    /// The idle window only exists while `Running` with zero occupancy.
    #[default]
    RunningOnly,
    /// Every `Starting` observation restarts the idle window, which then
    /// carries over into `Running`.
    ResetOnStarting,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegularTaskSettings {
    /// Poll period in seconds.
    pub interval: u64,
    /// Seconds a running server may sit empty before it is stopped.
    #[serde(default)]
    pub auto_shutdown_delay: u64,
    #[serde(default)]
    pub idle_timer: IdleTimerPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSettings {
    pub display_name: String,
    /// Runtime container name. Empty means "same as the key".
    #[serde(default)]
    pub container_name: String,
    #[serde(default)]
    pub auto_shutdown: bool,
}

impl ContainerSettings {
    pub fn new(display_name: impl Into<String>, container_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            container_name: container_name.into(),
            auto_shutdown: false,
        }
    }

    pub fn with_auto_shutdown(mut self, enabled: bool) -> Self {
        self.auto_shutdown = enabled;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    pub regular_task: RegularTaskSettings,
    pub registered_containers: BTreeMap<String, ContainerSettings>,
    #[serde(default = "default_queue_capacity")]
    pub command_queue_capacity: usize,
    #[serde(default = "default_command_timeout")]
    pub command_timeout: u32,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

fn default_command_timeout() -> u32 {
    DEFAULT_COMMAND_TIMEOUT_SECS
}

impl Settings {
    pub fn new(interval: u64, auto_shutdown_delay: u64) -> Self {
        Self {
            log_level: default_log_level(),
            regular_task: RegularTaskSettings {
                interval,
                auto_shutdown_delay,
                idle_timer: IdleTimerPolicy::default(),
            },
            registered_containers: BTreeMap::new(),
            command_queue_capacity: DEFAULT_QUEUE_CAPACITY,
            command_timeout: DEFAULT_COMMAND_TIMEOUT_SECS,
        }
    }

    pub fn with_container(
        mut self,
        key: impl Into<String>,
        mut container: ContainerSettings,
    ) -> Self {
        let key = key.into();
        if container.container_name.is_empty() {
            container.container_name = key.clone();
        }
        self.registered_containers.insert(key, container);
        self
    }

    pub fn with_idle_timer(mut self, policy: IdleTimerPolicy) -> Self {
        self.regular_task.idle_timer = policy;
        self
    }

    /// Parse, default and validate a settings document.
    pub fn from_json(raw: &str) -> Result<Self> {
        let mut settings: Settings = serde_json::from_str(raw)
            .map_err(|e| CoreError::SerializationError(e.to_string()))?;
        settings.fill_defaults();
        settings.validate()?;
        Ok(settings)
    }

    fn fill_defaults(&mut self) {
        for (key, container) in self.registered_containers.iter_mut() {
            if container.container_name.is_empty() {
                container.container_name = key.clone();
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.regular_task.interval == 0 {
            return Err(CoreError::InvalidSettings(
                "regular_task.interval must be > 0".to_string(),
            ));
        }
        if self.regular_task.interval > MAX_INTERVAL_SECS {
            return Err(CoreError::InvalidSettings(format!(
                "regular_task.interval must be <= {} seconds",
                MAX_INTERVAL_SECS
            )));
        }
        if self.regular_task.auto_shutdown_delay > MAX_AUTO_SHUTDOWN_DELAY_SECS {
            return Err(CoreError::InvalidSettings(format!(
                "regular_task.auto_shutdown_delay must be <= {} seconds",
                MAX_AUTO_SHUTDOWN_DELAY_SECS
            )));
        }
        if self.registered_containers.is_empty() {
            return Err(CoreError::InvalidSettings(
                "registered_containers must not be empty".to_string(),
            ));
        }
        if self.command_queue_capacity == 0 {
            return Err(CoreError::InvalidSettings(
                "command_queue_capacity must be > 0".to_string(),
            ));
        }
        for (key, container) in &self.registered_containers {
            if container.display_name.trim().is_empty() {
                return Err(CoreError::InvalidSettings(format!(
                    "container {}: display_name is required",
                    key
                )));
            }
            if container.container_name.trim().is_empty() {
                return Err(CoreError::InvalidSettings(format!(
                    "container {}: container_name is required",
                    key
                )));
            }
        }
        Ok(())
    }

    pub fn container(&self, key: &str) -> Option<&ContainerSettings> {
        self.registered_containers.get(key)
    }

    pub fn is_configured(&self, key: &str) -> bool {
        self.registered_containers.contains_key(key)
    }

    /// Poll period, clamped to `MAX_INTERVAL_SECS` for values that skipped
    /// validation.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.regular_task.interval.min(MAX_INTERVAL_SECS))
    }

    pub fn auto_shutdown_delay(&self) -> chrono::Duration {
        let secs = self
            .regular_task
            .auto_shutdown_delay
            .min(MAX_AUTO_SHUTDOWN_DELAY_SECS);
        chrono::Duration::seconds(secs as i64)
    }

    pub fn idle_timer(&self) -> IdleTimerPolicy {
        self.regular_task.idle_timer
    }

    /// Tracing level name derived from `log_level`; unknown values map to info.
    pub fn log_filter_level(&self) -> &'static str {
        match self.log_level.to_ascii_uppercase().as_str() {
            "TRACE" => "trace",
            "DEBUG" => "debug",
            "WARN" | "WARNING" => "warn",
            "ERROR" | "FATAL" => "error",
            _ => "info",
        }
    }
}
