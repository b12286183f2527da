//! Sensors: Named Sample Sources with History
//!
//! ## Overview
//!
//! A [`SampleSource`] is anything that can produce the current scalar value
//! on request: a GPIO pin, an MQTT topic cache, a model output, a file
//! replay. The engine never talks to sources directly; it goes through a
//! [`Sensor`], which adds:
//!
//! - a bounded, validated name (inline `heapless::String`)
//! - a [`Privacy`] label and a free-form metadata map
//! - a [`HistoryBuffer`] recording every observation, with the summary
//!   window kept up to date incrementally
//! - read deduplication: all reads stamped with the same timestamp share one
//!   physical read and its outcome (value, error or fallback), so every
//!   leaf over a sensor in one tick agrees
//! - an optional poll period: between polls the last outcome is held
//!
//! ## Non-Blocking Reads
//!
//! Sources return `nb::Result`. `WouldBlock` means "nothing new yet"; the
//! sensor then answers with its last recorded value, or
//! [`SourceError::NoSample`] if it never produced one.
//!
//! ```text
//! read_at(now)
//!    │
//!    ├─ last attempt at == now              ──→ repeat its outcome
//!    ├─ now - last attempt < poll period    ──→ repeat its outcome
//!    │
//!    └─ source.read(now)
//!          ├─ Ok(v), v finite      ──→ record (now, v), return v
//!          ├─ Ok(v), v NaN/inf     ──→ Err(InvalidValue)
//!          ├─ Err(WouldBlock)      ──→ last value or Err(NoSample)
//!          └─ Err(Other(e))        ──→ Err(e)
//! ```
//!
//! ## Usage Example
//!
//! ```rust
//! use tripwire_core::sensor::{FnSource, Sensor};
//! use tripwire_core::Privacy;
//!
//! let sensor = Sensor::builder("temperature", FnSource::new(|| 21.5))
//!     .metadata("unit", "celsius")
//!     .history_capacity(100)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(sensor.read_at(1_000), Ok(21.5));
//! assert_eq!(sensor.privacy(), Privacy::Public);
//! assert_eq!(sensor.history_len(), 1);
//! ```

use core::fmt;
use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::buffer::{HistoryBuffer, Sample};
use crate::config::validate_poll_interval;
use crate::constants::{
    DEFAULT_HISTORY_CAPACITY, DEFAULT_SUMMARY_WINDOW, MAX_SOURCE_NAME_LEN, MS_PER_SECOND,
};
use crate::errors::{ConfigResult, ConfigurationError, SourceError};
use crate::privacy::Privacy;
use crate::summary::SummarySnapshot;
use crate::time::{MonotonicTime, TimeSource, Timestamp};

/// Inline, length-bounded source name
pub type SourceName = heapless::String<MAX_SOURCE_NAME_LEN>;

/// Free-form descriptive attributes (unit, location, ...)
pub type Metadata = BTreeMap<String, String>;

/// Producer of the current scalar value
pub trait SampleSource: Send {
    /// Produce a value for `now`
    ///
    /// Must not block for long: a slow read stalls the whole tick.
    fn read(&mut self, now: Timestamp) -> nb::Result<f64, SourceError>;

    /// Short type tag shown in listings and logs
    fn kind(&self) -> &'static str {
        "custom"
    }
}

/// Source over an infallible closure
pub struct FnSource<F> {
    f: F,
}

impl<F> FnSource<F>
where
    F: FnMut() -> f64 + Send,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> SampleSource for FnSource<F>
where
    F: FnMut() -> f64 + Send,
{
    fn read(&mut self, _now: Timestamp) -> nb::Result<f64, SourceError> {
        Ok((self.f)())
    }

    fn kind(&self) -> &'static str {
        "fn"
    }
}

/// Outcome of the most recent physical read
#[derive(Debug, Clone)]
struct LastRead {
    at: Timestamp,
    outcome: Result<f64, SourceError>,
}

struct SourceSlot {
    source: Box<dyn SampleSource>,
    last: Option<LastRead>,
}

impl SourceSlot {
    /// Outcome to repeat instead of reading the source at `now`
    fn cached(&self, now: Timestamp, period_ms: Option<u64>) -> Option<Result<f64, SourceError>> {
        let last = self.last.as_ref()?;
        let held = now == last.at
            || period_ms.is_some_and(|period| now > last.at && now - last.at < period);
        held.then(|| last.outcome.clone())
    }
}

/// Named source with privacy label, metadata and history
pub struct Sensor {
    name: SourceName,
    kind: &'static str,
    privacy: Privacy,
    metadata: Metadata,
    poll_period_ms: Option<u64>,
    source: Mutex<SourceSlot>,
    history: Mutex<HistoryBuffer>,
    clock: RwLock<Arc<dyn TimeSource>>,
}

impl Sensor {
    pub fn builder<S: SampleSource + 'static>(name: impl Into<String>, source: S) -> SensorBuilder {
        SensorBuilder::new(name, Box::new(source))
    }

    /// Builder over an already boxed source, for sources chosen at runtime
    pub fn builder_boxed(name: impl Into<String>, source: Box<dyn SampleSource>) -> SensorBuilder {
        SensorBuilder::new(name, source)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn privacy(&self) -> Privacy {
        self.privacy
    }

    pub fn is_private(&self) -> bool {
        self.privacy.is_private()
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Minimum spacing of physical reads, if rate limited
    pub fn poll_interval_ms(&self) -> Option<u64> {
        self.poll_period_ms
    }

    /// Clock used by [`read`](Self::read)
    pub fn clock(&self) -> Arc<dyn TimeSource> {
        Arc::clone(&self.clock.read())
    }

    /// Switch to `clock`, e.g. the one of the scheduler polling this sensor
    pub(crate) fn bind_clock(&self, clock: Arc<dyn TimeSource>) {
        *self.clock.write() = clock;
    }

    /// Read at the sensor's own clock
    pub fn read(&self) -> Result<f64, SourceError> {
        let now = self.clock.read().now();
        self.read_at(now)
    }

    /// Read for a given pass timestamp
    ///
    /// The first call for a timestamp reads the source; later calls with the
    /// same timestamp, or inside the poll period, repeat its outcome.
    pub fn read_at(&self, now: Timestamp) -> Result<f64, SourceError> {
        let mut slot = self.source.lock();
        if let Some(outcome) = slot.cached(now, self.poll_period_ms) {
            return outcome;
        }

        let outcome = match slot.source.read(now) {
            Ok(value) if !value.is_finite() => Err(SourceError::InvalidValue),
            Ok(value) => {
                self.history.lock().record(Sample::new(now, value));
                Ok(value)
            }
            Err(nb::Error::WouldBlock) => self.latest().ok_or(SourceError::NoSample),
            Err(nb::Error::Other(e)) => Err(e),
        };
        slot.last = Some(LastRead {
            at: now,
            outcome: outcome.clone(),
        });
        outcome
    }

    /// Whether [`read_at`](Self::read_at) would read the source at `now`
    pub fn is_due(&self, now: Timestamp) -> bool {
        self.source.lock().cached(now, self.poll_period_ms).is_none()
    }

    /// Most recently recorded value, without reading the source
    pub fn latest(&self) -> Option<f64> {
        self.last_sample().map(|s| s.value)
    }

    pub fn last_sample(&self) -> Option<Sample> {
        self.history.lock().last().copied()
    }

    pub fn history_len(&self) -> usize {
        self.history.lock().len()
    }

    /// Statistics over the newest `window` recorded samples
    pub fn summary(&self, window: usize) -> Option<SummarySnapshot> {
        self.history.lock().summary(window).snapshot()
    }

    /// Text rendering of [`summary`](Self::summary), `"no data"` when empty
    pub fn summary_text(&self, window: usize, precision: usize) -> String {
        self.history.lock().summary(window).to_text(precision)
    }

    /// Run `f` against the history under its lock
    pub fn with_history<R>(&self, f: impl FnOnce(&HistoryBuffer) -> R) -> R {
        f(&self.history.lock())
    }

    pub fn clear_history(&self) {
        self.history.lock().clear();
    }
}

impl fmt::Debug for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sensor")
            .field("name", &self.name.as_str())
            .field("kind", &self.kind)
            .field("privacy", &self.privacy)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.name, self.kind, self.privacy)
    }
}

/// Builder for [`Sensor`]
///
/// ```rust
/// use tripwire_core::sensor::{FnSource, Sensor};
///
/// let camera = Sensor::builder("presence", FnSource::new(|| 0.0))
///     .private()
///     .build()
///     .unwrap();
/// assert!(camera.is_private());
/// ```
pub struct SensorBuilder {
    name: String,
    source: Box<dyn SampleSource>,
    privacy: Privacy,
    inherited: Privacy,
    metadata: Metadata,
    history_capacity: usize,
    summary_window: usize,
    rate: Option<PollRate>,
    clock: Option<Arc<dyn TimeSource>>,
}

#[derive(Debug, Clone, Copy)]
enum PollRate {
    Hz(f64),
    Interval(u64),
}

impl PollRate {
    fn period_ms(self) -> ConfigResult<u64> {
        match self {
            PollRate::Interval(ms) => {
                validate_poll_interval(ms)?;
                Ok(ms)
            }
            PollRate::Hz(hz) => {
                let invalid = ConfigurationError::InvalidRate { hz };
                if !hz.is_finite() || hz <= 0.0 {
                    return Err(invalid);
                }
                let ms = (MS_PER_SECOND as f64 / hz).round().max(1.0) as u64;
                validate_poll_interval(ms).map_err(|_| invalid)?;
                Ok(ms)
            }
        }
    }
}

impl SensorBuilder {
    pub(crate) fn new(name: impl Into<String>, source: Box<dyn SampleSource>) -> Self {
        Self {
            name: name.into(),
            source,
            privacy: Privacy::Public,
            inherited: Privacy::Public,
            metadata: Metadata::new(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            summary_window: DEFAULT_SUMMARY_WINDOW,
            rate: None,
            clock: None,
        }
    }

    pub fn privacy(mut self, privacy: Privacy) -> Self {
        self.privacy = privacy;
        self
    }

    pub fn private(self) -> Self {
        self.privacy(Privacy::Private)
    }

    /// Label that `privacy` cannot lower; derived sensors inherit it
    pub(crate) fn inherit_privacy(mut self, privacy: Privacy) -> Self {
        self.inherited = privacy;
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn metadata_map(mut self, metadata: Metadata) -> Self {
        self.metadata.extend(metadata);
        self
    }

    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    /// Window whose summary is maintained incrementally
    pub fn summary_window(mut self, window: usize) -> Self {
        self.summary_window = window;
        self
    }

    /// Poll the source at most `hz` times per second
    pub fn hz(mut self, hz: f64) -> Self {
        self.rate = Some(PollRate::Hz(hz));
        self
    }

    /// Poll the source at most once every `ms` milliseconds
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.rate = Some(PollRate::Interval(ms));
        self
    }

    /// Clock used by [`Sensor::read`]; defaults to a monotonic clock
    pub fn clock(mut self, clock: Arc<dyn TimeSource>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> ConfigResult<Arc<Sensor>> {
        let name = validate_name(&self.name)?;
        let history = HistoryBuffer::with_window(self.history_capacity, self.summary_window)?;
        let poll_period_ms = self.rate.map(PollRate::period_ms).transpose()?;
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicTime::new()));

        Ok(Arc::new(Sensor {
            name,
            kind: self.source.kind(),
            privacy: Privacy::any_private([self.privacy, self.inherited]),
            metadata: self.metadata,
            poll_period_ms,
            source: Mutex::new(SourceSlot {
                source: self.source,
                last: None,
            }),
            history: Mutex::new(history),
            clock: RwLock::new(clock),
        }))
    }
}

fn validate_name(name: &str) -> ConfigResult<SourceName> {
    let invalid = || ConfigurationError::InvalidSourceName {
        name: name.to_string(),
        max: MAX_SOURCE_NAME_LEN,
    };

    if name.trim().is_empty() {
        return Err(invalid());
    }
    SourceName::try_from(name).map_err(|_| invalid())
}
