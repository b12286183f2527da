//! Synthetic sources for demos, tests and load generation
//!
//! | Source            | Value                                        |
//! |-------------------|----------------------------------------------|
//! | [`ConstantSource`] | the same value forever                      |
//! | [`RandomSource`]   | uniform in `[low, high)`, optionally seeded |
//! | [`ToggleSource`]   | square wave driven by the tick timestamp    |
//!
//! ```rust
//! use tripwire_core::Sensor;
//! use tripwire_sources::RandomSource;
//!
//! let noise = RandomSource::new(0.0, 1.0)?.seeded(7);
//! let sensor = Sensor::builder("noise", noise).build()?;
//! let v = sensor.read_at(0)?;
//! assert!((0.0..1.0).contains(&v));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tripwire_core::errors::SourceError;
use tripwire_core::{SampleSource, Timestamp};

use crate::error::{ConfigError, Result};

fn check_range(low: f64, high: f64) -> Result<()> {
    if !low.is_finite() || !high.is_finite() || low >= high {
        return Err(ConfigError::Invalid(format!(
            "range must satisfy low < high with finite bounds, got [{low}, {high})"
        )));
    }
    Ok(())
}

/// Always reports the same value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantSource {
    value: f64,
}

impl ConstantSource {
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

impl SampleSource for ConstantSource {
    fn read(&mut self, _now: Timestamp) -> nb::Result<f64, SourceError> {
        Ok(self.value)
    }

    fn kind(&self) -> &'static str {
        "constant"
    }
}

/// Uniform random values
pub struct RandomSource {
    low: f64,
    high: f64,
    rng: StdRng,
}

impl RandomSource {
    /// Entropy-seeded source over `[low, high)`
    pub fn new(low: f64, high: f64) -> Result<Self> {
        check_range(low, high)?;
        Ok(Self {
            low,
            high,
            rng: StdRng::from_entropy(),
        })
    }

    /// Reseed for a reproducible stream
    pub fn seeded(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn range(&self) -> (f64, f64) {
        (self.low, self.high)
    }
}

impl SampleSource for RandomSource {
    fn read(&mut self, _now: Timestamp) -> nb::Result<f64, SourceError> {
        Ok(self.rng.gen_range(self.low..self.high))
    }

    fn kind(&self) -> &'static str {
        "random"
    }
}

/// Alternates between `low` and `high` every `period_ms`
///
/// The phase is derived from the read timestamp, so the output is the same
/// for any clock that reports the same time: `low` on `[0, period)`, `high`
/// on `[period, 2 * period)` and so on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToggleSource {
    period_ms: u64,
    low: f64,
    high: f64,
}

impl ToggleSource {
    pub fn new(period_ms: u64) -> Result<Self> {
        Self::with_levels(period_ms, 0.0, 1.0)
    }

    pub fn with_levels(period_ms: u64, low: f64, high: f64) -> Result<Self> {
        if period_ms == 0 {
            return Err(ConfigError::Invalid("toggle period must be positive".into()));
        }
        Ok(Self {
            period_ms,
            low,
            high,
        })
    }

    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }
}

impl SampleSource for ToggleSource {
    fn read(&mut self, now: Timestamp) -> nb::Result<f64, SourceError> {
        if (now / self.period_ms) % 2 == 0 {
            Ok(self.low)
        } else {
            Ok(self.high)
        }
    }

    fn kind(&self) -> &'static str {
        "toggle"
    }
}
