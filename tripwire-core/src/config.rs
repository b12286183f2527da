//! Runtime Configuration
//!
//! Tunables of the scheduler and the sensors it builds. Every field has a
//! default, so a partial document deserializes cleanly:
//!
//! ```rust
//! use tripwire_core::RuntimeConfig;
//!
//! let config: RuntimeConfig = serde_json::from_str(r#"{"poll_interval_ms": 250}"#).unwrap();
//! assert_eq!(config.poll_interval_ms, 250);
//! assert_eq!(config.history_capacity, 1000);
//! assert_eq!(config.redaction_marker, "***");
//! config.validate().unwrap();
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::time::MAX_POLL_INTERVAL_MS;
use crate::constants::{
    buffers::{DEFAULT_SUMMARY_PRECISION, MIN_HISTORY_CAPACITY},
    DEFAULT_HISTORY_CAPACITY, DEFAULT_POLL_INTERVAL_MS, DEFAULT_SUMMARY_WINDOW,
    REDACTION_MARKER,
};
use crate::errors::{ConfigResult, ConfigurationError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Tick period used by `start_configured`
    pub poll_interval_ms: u64,

    /// History capacity of sensors built through the scheduler
    pub history_capacity: usize,

    /// Window of summaries logged with samples, kept incrementally per sensor
    pub summary_window: usize,

    /// Decimal places in rendered summaries
    pub summary_precision: usize,

    /// Substituted for private values on display
    pub redaction_marker: String,

    /// Trace-log every sensor value (through the privacy gate) each tick
    pub log_samples: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            summary_window: DEFAULT_SUMMARY_WINDOW,
            summary_precision: DEFAULT_SUMMARY_PRECISION,
            redaction_marker: REDACTION_MARKER.to_string(),
            log_samples: false,
        }
    }
}

impl RuntimeConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        validate_poll_interval(self.poll_interval_ms)?;
        if self.history_capacity < MIN_HISTORY_CAPACITY {
            return Err(ConfigurationError::CapacityTooSmall {
                got: self.history_capacity,
                min: MIN_HISTORY_CAPACITY,
            });
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

pub(crate) fn validate_poll_interval(ms: u64) -> ConfigResult<()> {
    if ms == 0 || ms > MAX_POLL_INTERVAL_MS {
        return Err(ConfigurationError::InvalidPollInterval {
            ms,
            max: MAX_POLL_INTERVAL_MS,
        });
    }
    Ok(())
}
