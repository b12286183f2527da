//! Constants for Tripwire Core
//!
//! Centralized defaults and limits used by the engine. Every tunable that
//! also appears in [`RuntimeConfig`](crate::config::RuntimeConfig) takes its
//! default from here.
//!
//! ## Organization
//!
//! - **Time**: unit conversions and loop cadence
//! - **Buffers**: history sizes, summary windows and name limits

/// Time-related constants for intervals and unit conversion.
pub mod time;

/// Buffer sizes and bounded-string limits.
pub mod buffers;

pub use time::{MS_PER_SECOND, DEFAULT_POLL_INTERVAL_MS};

pub use buffers::{
    DEFAULT_HISTORY_CAPACITY, DEFAULT_SUMMARY_WINDOW, MAX_SOURCE_NAME_LEN,
    MIN_SEQUENCE_LEN,
};

/// Marker substituted for values read from private sources.
pub const REDACTION_MARKER: &str = "***";
