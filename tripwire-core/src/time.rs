//! Time management for the evaluation engine
//!
//! Every temporal decision in the engine (sustained-true spans, sequence
//! windows, sample stamping) is made against a [`TimeSource`]. Two sources
//! ship with the crate:
//! - [`MonotonicTime`]: backed by `std::time::Instant`, immune to wall-clock
//!   adjustment. This is what the scheduler uses by default. Every instance
//!   measures from one process-wide epoch, so sensors and schedulers
//!   created at different moments still agree on `now`.
//! - [`ManualTime`]: a shared, settable clock for tests and replay.
//!
//! Timestamps are milliseconds since the clock's own origin. They are only
//! meaningful relative to other timestamps from the same clock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use crate::constants::MS_PER_SECOND;
use crate::errors::{ConfigResult, ConfigurationError};

/// Timestamp in milliseconds since the clock origin
pub type Timestamp = u64;

/// Source of time for the engine
///
/// Implementations must be monotonic: `now()` never returns a value smaller
/// than a previous call on the same source.
pub trait TimeSource: Send + Sync {
    /// Get current timestamp in milliseconds
    fn now(&self) -> Timestamp;

    /// Get precision in milliseconds
    fn precision_ms(&self) -> u32 {
        1
    }
}

static EPOCH: OnceLock<Instant> = OnceLock::new();

/// Monotonic time source measuring from the process-wide epoch
///
/// The epoch is fixed by the first `MonotonicTime` created in the process.
#[derive(Debug, Clone)]
pub struct MonotonicTime {
    origin: Instant,
}

impl MonotonicTime {
    pub fn new() -> Self {
        Self {
            origin: *EPOCH.get_or_init(Instant::now),
        }
    }
}

impl Default for MonotonicTime {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicTime {
    fn now(&self) -> Timestamp {
        self.origin.elapsed().as_millis() as Timestamp
    }
}

/// Manually driven time source
///
/// Interior mutability lets one instance be shared (behind an `Arc`) between
/// the scheduler, sensors and the test that advances it.
///
/// ```rust
/// use tripwire_core::time::{ManualTime, TimeSource};
///
/// let clock = ManualTime::new(1_000);
/// clock.advance(500);
/// assert_eq!(clock.now(), 1_500);
/// ```
#[derive(Debug, Default)]
pub struct ManualTime {
    timestamp: AtomicU64,
}

impl ManualTime {
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            timestamp: AtomicU64::new(timestamp),
        }
    }

    /// Jump to an absolute timestamp. Moving backwards is ignored.
    pub fn set(&self, timestamp: Timestamp) {
        self.timestamp.fetch_max(timestamp, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: u64) {
        self.timestamp.fetch_add(ms, Ordering::SeqCst);
    }

    /// Advance by whole seconds
    pub fn advance_secs(&self, seconds: u64) {
        self.advance(seconds * MS_PER_SECOND);
    }
}

impl TimeSource for ManualTime {
    fn now(&self) -> Timestamp {
        self.timestamp.load(Ordering::SeqCst)
    }
}

/// Milliseconds between two timestamps, zero if `later` precedes `earlier`
pub fn elapsed_ms(earlier: Timestamp, later: Timestamp) -> u64 {
    later.saturating_sub(earlier)
}

/// Convert a duration in seconds to whole milliseconds
///
/// Negative, NaN and infinite inputs are configuration errors.
pub fn seconds_to_ms(seconds: f64) -> ConfigResult<u64> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(ConfigurationError::InvalidDuration { seconds });
    }
    Ok((seconds * MS_PER_SECOND as f64).round() as u64)
}

/// Convert a `Duration` to whole milliseconds, saturating
pub fn duration_to_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
