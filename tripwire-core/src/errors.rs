//! Error Types for the Rule Runtime
//!
//! ## Error Categories
//!
//! Errors fall into four groups, each with a different lifetime in the
//! system:
//!
//! ### Construction
//! - [`ConfigurationError`]: a condition, sensor, fusion or runtime setting
//!   is malformed (e.g. a `sequence` with one element, a negative `within`
//!   duration). Raised at construction, before the loop starts.
//!
//! ### Per-tick, per-rule
//! - [`SourceError`]: a sample source could not produce a value. The leaf
//!   that asked for it evaluates false for that tick and the failure is
//!   reported in the [`TickReport`](crate::scheduler::TickReport).
//! - [`CallbackError`]: a rule's callback returned an error or panicked.
//!   Remaining rules in the tick still run.
//!
//! Both per-tick kinds are wrapped in [`RuleFailure`] so they carry the
//! identity of the rule they belong to.
//!
//! ### Lifecycle
//! - [`RuntimeError`]: the scheduler was asked to do something its current
//!   state does not allow, a plugin failed, or the loop thread died.
//!
//! No error in this module is ever retried by the engine. A rule whose
//! source or callback fails is evaluated again on the next tick.
//!
//! ```rust
//! use tripwire_core::errors::ConfigurationError;
//! use tripwire_core::{sequence, Condition};
//!
//! let only_one = vec![Condition::new(|| true)];
//! match sequence(only_one, 5.0) {
//!     Err(ConfigurationError::SequenceTooShort { got, .. }) => assert_eq!(got, 1),
//!     _ => unreachable!(),
//! }
//! ```

use thiserror::Error;

use crate::scheduler::SchedulerState;

/// Result type for construction-time validation
pub type ConfigResult<T> = Result<T, ConfigurationError>;

/// Malformed construction parameters
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    /// `sequence` needs at least two steps
    #[error("sequence needs at least {min} conditions, got {got}")]
    SequenceTooShort {
        /// Number of conditions supplied
        got: usize,
        /// Minimum accepted
        min: usize,
    },

    /// Durations and windows must be finite and non-negative
    #[error("duration must be a finite, non-negative number of seconds, got {seconds}")]
    InvalidDuration { seconds: f64 },

    /// Buffers must hold at least one sample
    #[error("capacity must be at least {min}, got {got}")]
    CapacityTooSmall { got: usize, min: usize },

    /// The tick loop needs a positive, bounded period
    #[error("poll interval must be between 1 and {max} ms, got {ms}")]
    InvalidPollInterval { ms: u64, max: u64 },

    /// Source names are bounded inline strings
    #[error("source name {name:?} is empty or longer than {max} bytes")]
    InvalidSourceName { name: String, max: usize },

    /// Names are unique within a registry
    #[error("source {0:?} is already registered")]
    DuplicateSource(String),

    /// Fusion over nothing
    #[error("fusion needs at least one component")]
    EmptyFusion,

    /// One weight per value
    #[error("got {values} values but {weights} weights")]
    WeightMismatch { values: usize, weights: usize },

    /// Weights must not cancel out
    #[error("weights sum to zero")]
    ZeroWeightSum,

    /// Per-sensor polling rates must be positive and finite
    #[error("poll rate must be a positive, finite number of Hz, got {hz}")]
    InvalidRate { hz: f64 },
}

/// Failure to obtain a sample from a source
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    /// Lookup of a name that is not in the registry
    #[error("source {0:?} is not registered")]
    UnknownSource(String),

    /// The source has no fresh value and never produced one
    #[error("source has not produced a sample yet")]
    NoSample,

    /// NaN or infinity
    #[error("source returned a non-finite value")]
    InvalidValue,

    /// Adapter-level failure (I/O, disconnected device, ...)
    #[error("source unavailable: {0}")]
    Unavailable(String),
}

/// Failure raised from inside a rule callback
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallbackError {
    /// The callback returned an error
    #[error("callback failed: {0}")]
    Failed(String),

    /// The callback panicked; the payload message is preserved when it is a string
    #[error("callback panicked: {0}")]
    Panicked(String),
}

impl CallbackError {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }
}

/// A per-tick failure attributed to one rule
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleFailure {
    #[error("rule {rule:?}: reading {sensor:?} failed: {error}")]
    SourceRead {
        rule: String,
        sensor: String,
        error: SourceError,
    },

    /// The condition itself panicked; the rule counts as false for the tick
    #[error("rule {rule:?}: evaluation panicked: {reason}")]
    Evaluation { rule: String, reason: String },

    #[error("rule {rule:?}: {error}")]
    Callback { rule: String, error: CallbackError },
}

impl RuleFailure {
    /// Name of the rule the failure belongs to
    pub fn rule(&self) -> &str {
        match self {
            Self::SourceRead { rule, .. }
            | Self::Evaluation { rule, .. }
            | Self::Callback { rule, .. } => rule,
        }
    }
}

/// Scheduler lifecycle errors
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Operation requires a stopped scheduler
    #[error("scheduler must be stopped for this operation (currently {0:?})")]
    NotStopped(SchedulerState),

    /// A setup plugin returned an error; the scheduler stays stopped
    #[error("plugin {name:?} failed: {reason}")]
    Plugin { name: String, reason: String },

    #[error("failed to spawn tick thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// The loop thread terminated abnormally and its rules were lost
    #[error("tick thread panicked")]
    LoopPanicked,

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}
