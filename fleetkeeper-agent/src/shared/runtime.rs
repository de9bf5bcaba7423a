//! Seams to the container runtime. Both traits address containers by their
//! runtime name, never by the logical key.

use async_trait::async_trait;

use crate::shared::error::RuntimeError;

/// Result of inspecting one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inspection {
    pub runtime_id: String,
    pub running: bool,
    /// Health-check status, `None` when the container has no health check.
    pub health: Option<String>,
}

impl Inspection {
    pub fn running(runtime_id: impl Into<String>, health: Option<&str>) -> Self {
        Self {
            runtime_id: runtime_id.into(),
            running: true,
            health: health.map(str::to_string),
        }
    }

    pub fn stopped(runtime_id: impl Into<String>) -> Self {
        Self {
            runtime_id: runtime_id.into(),
            running: false,
            health: None,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Must return `RuntimeError::NotFound` when the container does not exist.
    async fn inspect(&self, container_name: &str) -> Result<Inspection, RuntimeError>;

    /// Count of active sessions inside a running container.
    async fn fetch_occupancy(&self, container_name: &str) -> Result<u32, RuntimeError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RuntimeClient: Send + Sync {
    async fn start(&self, container_name: &str) -> Result<(), RuntimeError>;

    async fn stop(&self, container_name: &str, timeout_seconds: u32) -> Result<(), RuntimeError>;

    async fn restart(&self, container_name: &str, timeout_seconds: u32)
        -> Result<(), RuntimeError>;
}
