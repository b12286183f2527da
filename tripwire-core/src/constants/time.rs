//! Time-Related Constants
//!
//! Conversion factors and the default cadence of the tick loop.

// ===== TIME UNIT CONVERSIONS =====

/// Milliseconds per second.
pub const MS_PER_SECOND: u64 = 1000;

// ===== LOOP CADENCE =====

/// Default tick period of the scheduler (milliseconds).
///
/// 10 Hz is fast enough for presence, door and threshold rules while
/// keeping an idle loop well under 1% of a core.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Upper bound on how long `stop()` may wait for the loop to notice
/// (milliseconds). Equal to the longest accepted poll interval.
pub const MAX_POLL_INTERVAL_MS: u64 = 60 * MS_PER_SECOND;
