//! In-memory container runtime used by unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::shared::error::RuntimeError;
use crate::shared::runtime::{Inspection, RuntimeClient, SnapshotSource};

#[derive(Debug, Clone, Default)]
pub struct FakeContainer {
    pub running: bool,
    pub health: Option<String>,
    pub players: u32,
    pub inspect_fails: bool,
    pub occupancy_fails: bool,
    pub command_fails: bool,
}

impl FakeContainer {
    pub fn running(players: u32) -> Self {
        Self {
            running: true,
            players,
            ..Self::default()
        }
    }

    pub fn stopped() -> Self {
        Self::default()
    }

    pub fn with_health(mut self, health: &str) -> Self {
        self.health = Some(health.to_string());
        self
    }
}

#[derive(Default)]
pub struct FakeFleet {
    containers: Mutex<HashMap<String, FakeContainer>>,
    calls: Mutex<Vec<String>>,
    delays: Mutex<HashMap<String, Duration>>,
    frozen: Mutex<bool>,
}

impl FakeFleet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_container(self, name: &str, container: FakeContainer) -> Self {
        self.set(name, container);
        self
    }

    pub fn set(&self, name: &str, container: FakeContainer) {
        self.containers
            .lock()
            .unwrap()
            .insert(name.to_string(), container);
    }

    pub fn update(&self, name: &str, f: impl FnOnce(&mut FakeContainer)) {
        let mut containers = self.containers.lock().unwrap();
        if let Some(container) = containers.get_mut(name) {
            f(container);
        }
    }

    pub fn remove(&self, name: &str) {
        self.containers.lock().unwrap().remove(name);
    }

    /// Runtime commands are recorded but no longer change container state.
    pub fn freeze(&self) {
        *self.frozen.lock().unwrap() = true;
    }

    /// Delay applied to a specific runtime call, e.g. `"start:mc-a"`.
    pub fn delay(&self, call: &str, duration: Duration) {
        self.delays
            .lock()
            .unwrap()
            .insert(call.to_string(), duration);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    async fn apply(
        &self,
        verb: &str,
        name: &str,
        f: impl FnOnce(&mut FakeContainer),
    ) -> Result<(), RuntimeError> {
        let call = format!("{}:{}", verb, name);
        self.calls.lock().unwrap().push(call.clone());

        let delay = self.delays.lock().unwrap().get(&call).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let frozen = *self.frozen.lock().unwrap();
        let mut containers = self.containers.lock().unwrap();
        let container = containers
            .get_mut(name)
            .ok_or_else(|| RuntimeError::NotFound(name.to_string()))?;
        if container.command_fails {
            return Err(RuntimeError::Operation(format!("{} refused", verb)));
        }
        if !frozen {
            f(container);
        }
        Ok(())
    }
}

#[async_trait]
impl SnapshotSource for FakeFleet {
    async fn inspect(&self, container_name: &str) -> Result<Inspection, RuntimeError> {
        let containers = self.containers.lock().unwrap();
        let container = containers
            .get(container_name)
            .ok_or_else(|| RuntimeError::NotFound(container_name.to_string()))?;
        if container.inspect_fails {
            return Err(RuntimeError::Operation("daemon unavailable".to_string()));
        }

        let runtime_id = format!("id-{}", container_name);
        Ok(if container.running {
            Inspection::running(runtime_id, container.health.as_deref())
        } else {
            Inspection::stopped(runtime_id)
        })
    }

    async fn fetch_occupancy(&self, container_name: &str) -> Result<u32, RuntimeError> {
        let containers = self.containers.lock().unwrap();
        let container = containers
            .get(container_name)
            .ok_or_else(|| RuntimeError::NotFound(container_name.to_string()))?;
        if container.occupancy_fails {
            return Err(RuntimeError::Operation("rcon timed out".to_string()));
        }
        Ok(container.players)
    }
}

#[async_trait]
impl RuntimeClient for FakeFleet {
    async fn start(&self, container_name: &str) -> Result<(), RuntimeError> {
        self.apply("start", container_name, |c| c.running = true)
            .await
    }

    async fn stop(&self, container_name: &str, _timeout_seconds: u32) -> Result<(), RuntimeError> {
        self.apply("stop", container_name, |c| {
            c.running = false;
            c.players = 0;
        })
        .await
    }

    async fn restart(
        &self,
        container_name: &str,
        _timeout_seconds: u32,
    ) -> Result<(), RuntimeError> {
        self.apply("restart", container_name, |c| {
            c.running = true;
            c.players = 0;
        })
        .await
    }
}
