//! Weighted Sensor Fusion
//!
//! A fused sensor is a derived [`Sensor`] whose source reads a fixed list of
//! component sensors at the same timestamp and combines them with a
//! weighted average:
//!
//! ```text
//! value = Σ(value_i × weight_i) / Σ weight_i
//! ```
//!
//! Components are read through [`Sensor::read_at`], so a fusion evaluated
//! in the same tick as its components reuses their recorded samples rather
//! than reading the hardware twice.
//!
//! The fused sensor is private when any component is private. The label is
//! computed once at construction and cannot be lowered afterwards.
//!
//! ```rust
//! use tripwire_core::fusion::FusionStrategy;
//! use tripwire_core::sensor::{FnSource, Sensor};
//!
//! let a = Sensor::builder("a", FnSource::new(|| 10.0)).build().unwrap();
//! let b = Sensor::builder("b", FnSource::new(|| 20.0)).build().unwrap();
//!
//! let mean = a.fuse_with(&b, "mean_ab", FusionStrategy::Average)
//!     .unwrap()
//!     .build()
//!     .unwrap();
//! assert_eq!(mean.read_at(0), Ok(15.0));
//! ```

use std::sync::Arc;

use crate::errors::{ConfigResult, ConfigurationError, SourceError};
use crate::privacy::Privacy;
use crate::sensor::{SampleSource, Sensor, SensorBuilder};
use crate::time::Timestamp;

/// Weighted mean of `values`
///
/// Fails on empty input, a length mismatch or weights summing to zero.
pub fn weighted_average(values: &[f64], weights: &[f64]) -> ConfigResult<f64> {
    if values.is_empty() || weights.is_empty() {
        return Err(ConfigurationError::EmptyFusion);
    }
    if values.len() != weights.len() {
        return Err(ConfigurationError::WeightMismatch {
            values: values.len(),
            weights: weights.len(),
        });
    }

    let total: f64 = weights.iter().sum();
    if total == 0.0 {
        return Err(ConfigurationError::ZeroWeightSum);
    }

    let weighted: f64 = values.iter().zip(weights).map(|(v, w)| v * w).sum();
    Ok(weighted / total)
}

/// How component values are combined
#[derive(Debug, Clone, PartialEq)]
pub enum FusionStrategy {
    /// Equal weights
    Average,
    /// One weight per component, in component order
    Weighted(Vec<f64>),
}

impl FusionStrategy {
    fn weights(self, components: usize) -> Vec<f64> {
        match self {
            FusionStrategy::Average => vec![1.0; components],
            FusionStrategy::Weighted(weights) => weights,
        }
    }
}

/// Source reading a weighted average of component sensors
pub struct WeightedFusion {
    components: Vec<Arc<Sensor>>,
    weights: Vec<f64>,
}

impl WeightedFusion {
    /// Validates the component/weight pairing up front
    pub fn new(components: Vec<Arc<Sensor>>, weights: Vec<f64>) -> ConfigResult<Self> {
        if components.is_empty() {
            return Err(ConfigurationError::EmptyFusion);
        }
        let zeros = vec![0.0; components.len()];
        weighted_average(&zeros, &weights)?;

        Ok(Self {
            components,
            weights,
        })
    }

    pub fn components(&self) -> &[Arc<Sensor>] {
        &self.components
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Combined privacy label of the components
    pub fn privacy(&self) -> Privacy {
        Privacy::any_private(self.components.iter().map(|c| c.privacy()))
    }
}

impl SampleSource for WeightedFusion {
    fn read(&mut self, now: Timestamp) -> nb::Result<f64, SourceError> {
        let values = self
            .components
            .iter()
            .map(|c| c.read_at(now))
            .collect::<Result<Vec<f64>, SourceError>>()?;

        weighted_average(&values, &self.weights)
            .map_err(|e| nb::Error::Other(SourceError::Unavailable(e.to_string())))
    }

    fn kind(&self) -> &'static str {
        "fusion"
    }
}

impl Sensor {
    /// Builder for a sensor fusing `components`
    ///
    /// Privacy of the result is at least the OR of the components' labels.
    pub fn fused(
        name: impl Into<String>,
        components: Vec<Arc<Sensor>>,
        strategy: FusionStrategy,
    ) -> ConfigResult<SensorBuilder> {
        let weights = strategy.weights(components.len());
        let fusion = WeightedFusion::new(components, weights)?;
        let privacy = fusion.privacy();

        Ok(Sensor::builder(name, fusion).inherit_privacy(privacy))
    }

    /// Two-sensor shorthand for [`Sensor::fused`]
    pub fn fuse_with(
        self: &Arc<Self>,
        other: &Arc<Sensor>,
        name: impl Into<String>,
        strategy: FusionStrategy,
    ) -> ConfigResult<SensorBuilder> {
        Sensor::fused(name, vec![Arc::clone(self), Arc::clone(other)], strategy)
    }
}
