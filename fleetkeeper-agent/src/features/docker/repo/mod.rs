use async_trait::async_trait;
use bollard::container::{
    InspectContainerOptions, RestartContainerOptions, StartContainerOptions, StopContainerOptions,
};
use bollard::errors::Error as DockerError;
use bollard::exec::{CreateExecOptions, StartExecResults};
use bollard::models::HealthStatusEnum;
use bollard::Docker;
use fleetkeeper_core::parse_player_list;
use futures::StreamExt;
use tracing::debug;

use crate::shared::error::RuntimeError;
use crate::shared::runtime::{Inspection, RuntimeClient, SnapshotSource};

const PLAYER_LIST_COMMAND: [&str; 2] = ["rcon-cli", "list"];

/// Snapshot source and runtime client backed by the local Docker daemon.
#[derive(Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connects using `DOCKER_HOST` or the platform default socket.
    pub fn connect() -> Result<Self, RuntimeError> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| RuntimeError::Operation(format!("failed to connect to docker: {}", e)))?;
        Ok(Self::new(docker))
    }

    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }
}

fn map_error(container_name: &str, error: DockerError) -> RuntimeError {
    match error {
        DockerError::DockerResponseServerError {
            status_code: 404, ..
        } => RuntimeError::NotFound(container_name.to_string()),
        other => RuntimeError::Operation(other.to_string()),
    }
}

fn health_label(status: &HealthStatusEnum) -> Option<&'static str> {
    match status {
        HealthStatusEnum::HEALTHY => Some("healthy"),
        HealthStatusEnum::STARTING => Some("starting"),
        HealthStatusEnum::UNHEALTHY => Some("unhealthy"),
        HealthStatusEnum::NONE | HealthStatusEnum::EMPTY => None,
    }
}

#[async_trait]
impl SnapshotSource for DockerRuntime {
    async fn inspect(&self, container_name: &str) -> Result<Inspection, RuntimeError> {
        let response = self
            .docker
            .inspect_container(container_name, None::<InspectContainerOptions>)
            .await
            .map_err(|e| map_error(container_name, e))?;

        let runtime_id = response.id.unwrap_or_default();
        let state = response.state.unwrap_or_default();
        if !state.running.unwrap_or(false) {
            return Ok(Inspection::stopped(runtime_id));
        }

        let health = state
            .health
            .and_then(|h| h.status)
            .as_ref()
            .and_then(health_label);
        Ok(Inspection::running(runtime_id, health))
    }

    async fn fetch_occupancy(&self, container_name: &str) -> Result<u32, RuntimeError> {
        let exec = self
            .docker
            .create_exec(
                container_name,
                CreateExecOptions {
                    cmd: Some(PLAYER_LIST_COMMAND.to_vec()),
                    attach_stdout: Some(true),
                    attach_stderr: Some(true),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| map_error(container_name, e))?;

        let output = match self
            .docker
            .start_exec(&exec.id, None)
            .await
            .map_err(|e| map_error(container_name, e))?
        {
            StartExecResults::Attached { mut output, .. } => {
                let mut raw = Vec::new();
                while let Some(chunk) = output.next().await {
                    let chunk = chunk.map_err(|e| map_error(container_name, e))?;
                    raw.extend_from_slice(&chunk.into_bytes());
                }
                String::from_utf8_lossy(&raw).into_owned()
            }
            StartExecResults::Detached => {
                return Err(RuntimeError::Operation(
                    "player list exec detached unexpectedly".to_string(),
                ))
            }
        };

        let players = parse_player_list(&output);
        debug!(container = %container_name, players = ?players, "Fetched player list");
        Ok(players.len() as u32)
    }
}

#[async_trait]
impl RuntimeClient for DockerRuntime {
    async fn start(&self, container_name: &str) -> Result<(), RuntimeError> {
        self.docker
            .start_container(container_name, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| map_error(container_name, e))
    }

    async fn stop(&self, container_name: &str, timeout_seconds: u32) -> Result<(), RuntimeError> {
        self.docker
            .stop_container(
                container_name,
                Some(StopContainerOptions {
                    t: i64::from(timeout_seconds),
                }),
            )
            .await
            .map_err(|e| map_error(container_name, e))
    }

    async fn restart(
        &self,
        container_name: &str,
        timeout_seconds: u32,
    ) -> Result<(), RuntimeError> {
        self.docker
            .restart_container(
                container_name,
                Some(RestartContainerOptions {
                    t: timeout_seconds as isize,
                }),
            )
            .await
            .map_err(|e| map_error(container_name, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_404_is_not_found() {
        let error = DockerError::DockerResponseServerError {
            status_code: 404,
            message: "No such container: mc-survival".to_string(),
        };
        assert_eq!(
            map_error("mc-survival", error),
            RuntimeError::NotFound("mc-survival".to_string())
        );
    }

    #[test]
    fn test_other_status_is_operation_error() {
        let error = DockerError::DockerResponseServerError {
            status_code: 500,
            message: "daemon exploded".to_string(),
        };
        let mapped = map_error("mc-survival", error);
        assert!(!mapped.is_not_found());
        assert!(mapped.to_string().contains("daemon exploded"));
    }

    #[test]
    fn test_health_labels() {
        assert_eq!(health_label(&HealthStatusEnum::HEALTHY), Some("healthy"));
        assert_eq!(health_label(&HealthStatusEnum::STARTING), Some("starting"));
        assert_eq!(health_label(&HealthStatusEnum::UNHEALTHY), Some("unhealthy"));
        assert_eq!(health_label(&HealthStatusEnum::NONE), None);
        assert_eq!(health_label(&HealthStatusEnum::EMPTY), None);
    }
}
