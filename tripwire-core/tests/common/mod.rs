//! Shared fixtures for integration tests
//!
//! - switchable conditions and counting callbacks
//! - a scripted sample source with injectable failures
//! - a capturing logger for asserting on warnings
//! - a manual-clock scheduler

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};

use log::{Level, LevelFilter, Log, Metadata, Record};

use tripwire_core::errors::SourceError;
use tripwire_core::sensor::SampleSource;
use tripwire_core::time::{ManualTime, Timestamp};
use tripwire_core::{Condition, Scheduler};

/// Boolean flag exposed as a condition leaf
#[derive(Clone, Default)]
pub struct Switch {
    state: Arc<AtomicBool>,
}

impl Switch {
    pub fn new(initial: bool) -> Self {
        Self {
            state: Arc::new(AtomicBool::new(initial)),
        }
    }

    pub fn set(&self, value: bool) {
        self.state.store(value, Ordering::SeqCst);
    }

    pub fn condition(&self) -> Condition {
        let state = Arc::clone(&self.state);
        Condition::new(move || state.load(Ordering::SeqCst))
    }

    /// Leaf that also counts how often it is evaluated
    pub fn counted(&self) -> (Condition, CallCounter) {
        let state = Arc::clone(&self.state);
        let counter = CallCounter::new();
        let hits = counter.clone();
        let cond = Condition::new(move || {
            hits.hit();
            state.load(Ordering::SeqCst)
        });
        (cond, counter)
    }
}

/// Shared invocation counter
#[derive(Clone, Default)]
pub struct CallCounter {
    count: Arc<AtomicUsize>,
}

impl CallCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hit(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Callback that increments this counter
    pub fn callback(&self) -> impl FnMut() + Send + 'static {
        let counter = self.clone();
        move || counter.hit()
    }

    /// Blocks until the count reaches `target` or `timeout` passes
    pub fn wait_for(&self, target: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.count() >= target {
                return true;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        self.count() >= target
    }
}

/// One step of a scripted source
#[derive(Debug, Clone)]
pub enum Step {
    Value(f64),
    Fail(&'static str),
    Block,
}

/// Replays a script, repeating the final step forever
pub struct ScriptedSource {
    steps: Vec<Step>,
    pos: usize,
}

impl ScriptedSource {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps, pos: 0 }
    }

    pub fn values(values: &[f64]) -> Self {
        Self::new(values.iter().copied().map(Step::Value).collect())
    }
}

impl SampleSource for ScriptedSource {
    fn read(&mut self, _now: Timestamp) -> nb::Result<f64, SourceError> {
        let idx = self.pos.min(self.steps.len().saturating_sub(1));
        self.pos += 1;
        match self.steps.get(idx) {
            Some(Step::Value(v)) => Ok(*v),
            Some(Step::Fail(reason)) => Err(nb::Error::Other(SourceError::Unavailable(
                (*reason).to_string(),
            ))),
            Some(Step::Block) | None => Err(nb::Error::WouldBlock),
        }
    }

    fn kind(&self) -> &'static str {
        "scripted"
    }
}

/// Wraps a source and counts physical reads
pub struct CountingSource<S> {
    inner: S,
    reads: CallCounter,
}

impl<S: SampleSource> CountingSource<S> {
    pub fn new(inner: S) -> (Self, CallCounter) {
        let reads = CallCounter::new();
        let source = Self {
            inner,
            reads: reads.clone(),
        };
        (source, reads)
    }
}

impl<S: SampleSource> SampleSource for CountingSource<S> {
    fn read(&mut self, now: Timestamp) -> nb::Result<f64, SourceError> {
        self.reads.hit();
        self.inner.read(now)
    }

    fn kind(&self) -> &'static str {
        self.inner.kind()
    }
}

/// Scheduler on a manual clock starting at zero
pub fn manual_scheduler() -> (Scheduler, Arc<ManualTime>) {
    let clock = Arc::new(ManualTime::new(0));
    let scheduler = Scheduler::default().with_clock(clock.clone());
    (scheduler, clock)
}

/// Deterministic xorshift generator
pub struct TestRng {
    state: u32,
}

impl TestRng {
    pub fn new(seed: u32) -> Self {
        Self { state: seed.max(1) }
    }

    pub fn next_u32(&mut self) -> u32 {
        self.state ^= self.state << 13;
        self.state ^= self.state >> 17;
        self.state ^= self.state << 5;
        self.state
    }

    pub fn next_f64(&mut self) -> f64 {
        (self.next_u32() >> 8) as f64 / 16_777_216.0
    }

    pub fn gen_range(&mut self, min: f64, max: f64) -> f64 {
        min + self.next_f64() * (max - min)
    }
}

/// Logger recording every message at `Trace` and above
pub struct CaptureLogger {
    records: Mutex<Vec<(Level, String)>>,
}

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if let Ok(mut records) = self.records.lock() {
            records.push((record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {}
}

impl CaptureLogger {
    /// Installs the process-wide capture logger once and returns it
    pub fn install() -> &'static CaptureLogger {
        static LOGGER: OnceLock<CaptureLogger> = OnceLock::new();
        let logger = LOGGER.get_or_init(|| CaptureLogger {
            records: Mutex::new(Vec::new()),
        });
        if log::set_logger(logger).is_ok() {
            log::set_max_level(LevelFilter::Trace);
        }
        logger
    }

    /// Messages at `level` containing `needle`
    pub fn matching(&self, level: Level, needle: &str) -> Vec<String> {
        self.records
            .lock()
            .map(|records| {
                records
                    .iter()
                    .filter(|(l, msg)| *l == level && msg.contains(needle))
                    .map(|(_, msg)| msg.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Asserts two floats agree within a tolerance
#[macro_export]
macro_rules! assert_close {
    ($left:expr, $right:expr) => {
        assert_close!($left, $right, 1e-9)
    };
    ($left:expr, $right:expr, $tol:expr) => {{
        let (l, r): (f64, f64) = ($left, $right);
        assert!(
            (l - r).abs() <= $tol,
            "{} and {} differ by more than {}",
            l,
            r,
            $tol
        );
    }};
}
