//! Sensor Registry
//!
//! Name-keyed collection of sensors shared between the scheduler, the tick
//! thread and any callback that needs to look a sensor up. The map sits
//! behind a `parking_lot::RwLock`: lookups from callbacks and the tick loop
//! take the read side and never block each other.
//!
//! Listings are ordered by name.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;

use crate::errors::{ConfigResult, ConfigurationError, SourceError};
use crate::privacy::Privacy;
use crate::sensor::Sensor;

#[derive(Debug, Default)]
pub struct SensorRegistry {
    sensors: RwLock<BTreeMap<String, Arc<Sensor>>>,
}

impl SensorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sensor; names are unique
    pub fn add(&self, sensor: Arc<Sensor>) -> ConfigResult<()> {
        let mut sensors = self.sensors.write();
        let name = sensor.name().to_string();
        if sensors.contains_key(&name) {
            return Err(ConfigurationError::DuplicateSource(name));
        }
        debug!("registered sensor {sensor}");
        sensors.insert(name, sensor);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Arc<Sensor>, SourceError> {
        self.sensors
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| SourceError::UnknownSource(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sensors.read().contains_key(name)
    }

    pub fn remove(&self, name: &str) -> Option<Arc<Sensor>> {
        self.sensors.write().remove(name)
    }

    /// Snapshot of every sensor, ordered by name
    pub fn list_all(&self) -> Vec<Arc<Sensor>> {
        self.sensors.read().values().cloned().collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.sensors.read().keys().cloned().collect()
    }

    pub fn with_privacy(&self, privacy: Privacy) -> Vec<Arc<Sensor>> {
        self.sensors
            .read()
            .values()
            .filter(|s| s.privacy() == privacy)
            .cloned()
            .collect()
    }

    pub fn public(&self) -> Vec<Arc<Sensor>> {
        self.with_privacy(Privacy::Public)
    }

    pub fn private(&self) -> Vec<Arc<Sensor>> {
        self.with_privacy(Privacy::Private)
    }

    pub fn len(&self) -> usize {
        self.sensors.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.read().is_empty()
    }

    pub fn clear(&self) {
        self.sensors.write().clear();
    }
}
