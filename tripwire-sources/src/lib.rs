//! Reference Sample Sources and Sensor Configuration
//!
//! ## Overview
//!
//! `tripwire-core` only knows the [`SampleSource`](tripwire_core::SampleSource)
//! trait. This crate provides ready-made implementations and a loader that
//! turns a JSON or YAML file into registered sensors.
//!
//! ### Sources
//!
//! | Type       | Kind tag   | Typical use                                 |
//! |------------|------------|---------------------------------------------|
//! | Constant   | `constant` | fixed set points, tests                     |
//! | Random     | `random`   | noise, load generation, demos               |
//! | Toggle     | `toggle`   | periodic on/off signals (doors, motion)     |
//! | Replay     | `replay`   | recorded traces, reproducible scenarios     |
//!
//! ### Configuration
//!
//! See [`config`] for the file layout.
//!
//! ```rust,no_run
//! use tripwire_sources::SensorsConfig;
//!
//! let mut scheduler = SensorsConfig::load("sensors.yaml")?.into_scheduler()?;
//! scheduler.start_configured()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod replay;
pub mod synthetic;

pub use config::{SensorConfig, SensorsConfig, SourceKind};
pub use error::ConfigError;
pub use replay::ReplaySource;
pub use synthetic::{ConstantSource, RandomSource, ToggleSource};
