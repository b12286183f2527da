//! Buffer Sizes and Bounded-String Limits

// ===== HISTORY BUFFERS =====

/// Default number of samples a sensor retains.
///
/// 1000 samples at the default 10 Hz tick covers the last 100 seconds,
/// about 16 KB per sensor.
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// Smallest accepted history capacity.
pub const MIN_HISTORY_CAPACITY: usize = 1;

// ===== SUMMARIES =====

/// Default window for rolling summaries (samples).
pub const DEFAULT_SUMMARY_WINDOW: usize = 10;

/// Decimal places used when a summary is rendered as text.
pub const DEFAULT_SUMMARY_PRECISION: usize = 2;

// ===== CONDITIONS =====

/// Fewest steps a `sequence` accepts; a single step is just a rising edge.
pub const MIN_SEQUENCE_LEN: usize = 2;

// ===== NAMES =====

/// Maximum length of a source name in bytes.
///
/// Names are stored inline so they can be copied into log records and
/// failure reports without allocation.
pub const MAX_SOURCE_NAME_LEN: usize = 32;
