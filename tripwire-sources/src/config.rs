//! File-based Sensor Configuration
//!
//! ## Overview
//!
//! A configuration file declares the runtime settings and the sensors to
//! register. The format is picked from the extension: `.json` or
//! `.yaml`/`.yml`.
//!
//! ```yaml
//! runtime:
//!   poll_interval_ms: 50
//!   redaction_marker: "<hidden>"
//! sensors:
//!   - name: hallway_temp
//!     type: random
//!     low: 18.0
//!     high: 24.0
//!     seed: 7
//!     metadata:
//!       unit: celsius
//!   - name: occupancy
//!     type: toggle
//!     period_ms: 5000
//!     privacy: private
//!     hz: 2
//!   - name: recorded_lux
//!     type: replay
//!     path: lux.csv
//!     column: 1
//!     looped: true
//! ```
//!
//! Relative replay paths are resolved against the directory of the
//! configuration file. `hz` caps how often the scheduler polls a sensor.
//!
//! ## Building
//!
//! ```text
//!   file ──load──> SensorsConfig ──into_scheduler──> Scheduler
//!                        │                              │
//!                        └──populate_registry──> SensorRegistry
//! ```
//!
//! Sensors built through [`SensorsConfig::populate`] share the scheduler's
//! clock, history capacity and summary window.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use tripwire_core::sensor::SensorBuilder;
use tripwire_core::{Privacy, RuntimeConfig, SampleSource, Scheduler, Sensor, SensorRegistry};

use crate::error::{ConfigError, Result};
use crate::replay::ReplaySource;
use crate::synthetic::{ConstantSource, RandomSource, ToggleSource};

fn default_high() -> f64 {
    1.0
}

/// Source type and its parameters, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceKind {
    Constant {
        value: f64,
    },
    Random {
        #[serde(default)]
        low: f64,
        #[serde(default = "default_high")]
        high: f64,
        #[serde(default)]
        seed: Option<u64>,
    },
    Toggle {
        period_ms: u64,
        #[serde(default)]
        low: f64,
        #[serde(default = "default_high")]
        high: f64,
    },
    Replay {
        path: PathBuf,
        #[serde(default)]
        column: usize,
        #[serde(default)]
        looped: bool,
    },
}

impl SourceKind {
    /// Instantiate the source, resolving relative paths against `base_dir`
    pub fn build(&self, base_dir: Option<&Path>) -> Result<Box<dyn SampleSource>> {
        Ok(match self {
            SourceKind::Constant { value } => Box::new(ConstantSource::new(*value)),
            SourceKind::Random { low, high, seed } => {
                let source = RandomSource::new(*low, *high)?;
                match seed {
                    Some(seed) => Box::new(source.seeded(*seed)),
                    None => Box::new(source),
                }
            }
            SourceKind::Toggle {
                period_ms,
                low,
                high,
            } => Box::new(ToggleSource::with_levels(*period_ms, *low, *high)?),
            SourceKind::Replay {
                path,
                column,
                looped,
            } => {
                let path = match base_dir {
                    Some(dir) if path.is_relative() => dir.join(path),
                    _ => path.clone(),
                };
                Box::new(ReplaySource::from_path(path, *column)?.looped(*looped))
            }
        })
    }
}

/// One declared sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    pub name: String,

    #[serde(default)]
    pub privacy: Privacy,

    #[serde(default)]
    pub metadata: BTreeMap<String, String>,

    /// Overrides the runtime-wide history capacity
    #[serde(default)]
    pub history_capacity: Option<usize>,

    /// Maximum poll rate; unset polls on every tick
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hz: Option<f64>,

    #[serde(flatten)]
    pub source: SourceKind,
}

impl SensorConfig {
    fn builder(&self, runtime: &RuntimeConfig, base_dir: Option<&Path>) -> Result<SensorBuilder> {
        let source = self.source.build(base_dir).map_err(|e| match e {
            ConfigError::Invalid(reason) => {
                ConfigError::Invalid(format!("sensor {:?}: {reason}", self.name))
            }
            other => other,
        })?;
        let mut builder = Sensor::builder_boxed(self.name.clone(), source)
            .privacy(self.privacy)
            .metadata_map(self.metadata.clone())
            .history_capacity(self.history_capacity.unwrap_or(runtime.history_capacity))
            .summary_window(runtime.summary_window);
        if let Some(hz) = self.hz {
            builder = builder.hz(hz);
        }
        Ok(builder)
    }
}

/// Runtime settings plus declared sensors
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorsConfig {
    pub runtime: RuntimeConfig,
    pub sensors: Vec<SensorConfig>,

    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

impl SensorsConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a `.json`, `.yaml` or `.yml` file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let read = || {
            std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        };

        let mut config = match ext.as_deref() {
            Some("json") => Self::from_json_str(&read()?)?,
            Some("yaml") | Some("yml") => Self::from_yaml_str(&read()?)?,
            _ => return Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        };
        config.base_dir = path.parent().map(Path::to_path_buf);
        info!(
            "loaded {} sensor definitions from {:?}",
            config.sensors.len(),
            path
        );
        Ok(config)
    }

    /// Directory relative replay paths resolve against
    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Checks runtime settings and name uniqueness without touching files
    pub fn validate(&self) -> Result<()> {
        self.runtime.validate()?;
        let mut seen = std::collections::BTreeSet::new();
        for sensor in &self.sensors {
            if !seen.insert(sensor.name.as_str()) {
                return Err(ConfigError::Configuration(
                    tripwire_core::ConfigurationError::DuplicateSource(sensor.name.clone()),
                ));
            }
        }
        Ok(())
    }

    /// Build every sensor on the scheduler's clock and register it
    pub fn populate(&self, scheduler: &Scheduler) -> Result<Vec<Arc<Sensor>>> {
        let mut built = Vec::with_capacity(self.sensors.len());
        for declared in &self.sensors {
            let sensor = declared
                .builder(scheduler.config(), self.base_dir())?
                .clock(Arc::clone(scheduler.clock()))
                .build()?;
            scheduler.add_sensor(Arc::clone(&sensor))?;
            debug!("configured sensor {sensor}");
            built.push(sensor);
        }
        Ok(built)
    }

    /// Build every sensor on the monotonic clock into `registry`
    pub fn populate_registry(&self, registry: &SensorRegistry) -> Result<Vec<Arc<Sensor>>> {
        let mut built = Vec::with_capacity(self.sensors.len());
        for declared in &self.sensors {
            let sensor = declared.builder(&self.runtime, self.base_dir())?.build()?;
            registry.add(Arc::clone(&sensor))?;
            built.push(sensor);
        }
        Ok(built)
    }

    /// Scheduler configured from `runtime` with every sensor registered
    pub fn into_scheduler(self) -> Result<Scheduler> {
        let scheduler = Scheduler::new(self.runtime.clone())?;
        self.populate(&scheduler)?;
        Ok(scheduler)
    }
}
