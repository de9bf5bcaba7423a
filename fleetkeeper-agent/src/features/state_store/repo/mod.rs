use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::shared::types::{ContainerSnapshot, FleetSummary, Settings};

struct StoreInner {
    settings: Arc<Settings>,
    containers: HashMap<String, ContainerSnapshot>,
}

/// Shared view of the fleet: latest snapshot per key plus the active settings.
///
/// One reader/writer lock guards both maps. Snapshots and settings are only
/// ever replaced whole, so a poisoned lock still holds consistent data and is
/// recovered rather than surfaced.
#[derive(Clone)]
pub struct StateStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl StateStore {
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(StoreInner {
                settings: Arc::new(settings),
                containers: HashMap::new(),
            })),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &str) -> Option<ContainerSnapshot> {
        self.read().containers.get(key).cloned()
    }

    /// Independent copy of every snapshot.
    pub fn get_all(&self) -> HashMap<String, ContainerSnapshot> {
        self.read().containers.clone()
    }

    pub fn put(&self, key: impl Into<String>, snapshot: ContainerSnapshot) {
        self.write().containers.insert(key.into(), snapshot);
    }

    pub fn remove(&self, key: &str) -> Option<ContainerSnapshot> {
        self.write().containers.remove(key)
    }

    pub fn len(&self) -> usize {
        self.read().containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().containers.is_empty()
    }

    pub fn get_settings(&self) -> Arc<Settings> {
        Arc::clone(&self.read().settings)
    }

    /// Swap in a new settings snapshot. Readers holding the old `Arc` keep a
    /// fully-formed view.
    pub fn set_settings(&self, settings: Settings) {
        self.write().settings = Arc::new(settings);
    }

    pub fn summary(&self) -> FleetSummary {
        FleetSummary::from_snapshots(self.read().containers.values())
    }
}
