//! Temporal condition and event runtime for Tripwire
//!
//! Build boolean expressions over live sensor values, extend them with
//! sustained-true (`within`) and ordered (`sequence`) operators, and get a
//! callback exactly once each time an expression turns from false to true.
//!
//! Key guarantees:
//! - One clock read per tick; every node in a tick agrees on `now`
//! - Stateful nodes advance at most once per tick, even when shared
//! - A failing source or callback never stops the other rules
//! - Private values never reach a log line unredacted
//!
//! ```no_run
//! use tripwire_core::sensor::FnSource;
//! use tripwire_core::{within, Condition, RuntimeConfig, Scheduler};
//!
//! let mut scheduler = Scheduler::new(RuntimeConfig::default()).unwrap();
//! let temp = scheduler
//!     .sensor_builder("temperature", FnSource::new(|| 31.0))
//!     .build()
//!     .unwrap();
//! scheduler.add_sensor(temp.clone()).unwrap();
//!
//! let hot = within(5.0, Condition::sensor(&temp, |t| t > 30.0)).unwrap();
//! scheduler.register("overheat", hot, || println!("too hot for 5 s")).unwrap();
//!
//! scheduler.start(100).unwrap();
//! // ...
//! scheduler.stop().unwrap();
//! ```

#![deny(unsafe_code)]

pub mod buffer;
pub mod condition;
pub mod config;
pub mod constants;
pub mod edge;
pub mod errors;
pub mod fusion;
pub mod plugin;
pub mod privacy;
pub mod registry;
pub mod scheduler;
pub mod sensor;
pub mod summary;
pub mod temporal;
pub mod time;

// Public API
pub use buffer::{HistoryBuffer, Sample};
pub use condition::{and, not, or, Condition, EvalContext, Predicate};
pub use config::RuntimeConfig;
pub use edge::EdgeDetector;
pub use errors::{
    CallbackError, ConfigResult, ConfigurationError, RuleFailure, RuntimeError, SourceError,
};
pub use fusion::{weighted_average, FusionStrategy};
pub use privacy::{Privacy, PrivacyGate};
pub use registry::SensorRegistry;
pub use scheduler::{RuleId, Scheduler, SchedulerState, TickReport};
pub use sensor::{SampleSource, Sensor};
pub use summary::{RollingSummary, SummarySnapshot, Trend};
pub use temporal::{sequence, within, within_duration};
pub use time::{ManualTime, MonotonicTime, TimeSource, Timestamp};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_exists() {
        assert!(!VERSION.is_empty());
    }
}
