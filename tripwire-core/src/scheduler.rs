//! Scheduler and Tick Loop
//!
//! ## Overview
//!
//! The [`Scheduler`] owns the registered rules, the sensor registry, the
//! privacy gate and the plugin list, and drives evaluation on a dedicated
//! thread at a fixed cadence.
//!
//! ```text
//!            register() / add_plugin()          start(ms)
//! ┌─────────┐ ─────────────────────────▶ ┌──────────────┐ ───────────▶ ┌─────────┐
//! │ caller  │                            │   Stopped    │              │ Running │
//! └─────────┘                            └──────────────┘ ◀─────────── └─────────┘
//!                                              ▲         join   │ stop()
//!                                              │                ▼
//!                                              └──────── ┌──────────┐
//!                                                        │ Stopping │
//!                                                        └──────────┘
//! ```
//!
//! ## One Tick
//!
//! 1. Read `now` once from the clock and open an evaluation pass.
//! 2. Poll every registered sensor that is due at `now` so histories
//!    advance even for sensors no rule mentions. Sensors with a poll rate
//!    are skipped until their period has elapsed. Failures are logged and
//!    reported.
//! 3. For each rule in registration order: evaluate its condition, push the
//!    result through the rule's edge detector (the stored value flips before
//!    the callback runs), and on a rising edge invoke the callback.
//!
//! Callbacks run synchronously on the tick thread. A returned error or a
//! panic is caught, logged with the rule name and collected in the
//! [`TickReport`]; the remaining rules of the tick still run. A condition
//! that panics counts as `false` for that tick.
//!
//! ## Registration
//!
//! Rules are registered while stopped. Registration evaluates the condition
//! once to seed the rule's edge detector and never fires the callback, even
//! when the condition already holds. A condition that panics while seeding
//! is logged and seeds `false`.
//!
//! Sensors added through [`Scheduler::add_sensor`] or present in a registry
//! handed to [`Scheduler::with_registry`] are rebound to the scheduler's
//! clock, so their own reads and the tick passes share one time base.
//!
//! ## Stopping
//!
//! `stop()` signals the loop over a channel. The loop finishes the tick in
//! flight, wakes from its inter-tick wait immediately and exits; `stop()`
//! returns once the thread is joined. Calling it on a stopped scheduler is
//! a no-op.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, error, trace, warn};
use parking_lot::Mutex;

use crate::condition::{Condition, EvalContext, ReadFailure};
use crate::config::{validate_poll_interval, RuntimeConfig};
use crate::edge::EdgeDetector;
use crate::errors::{CallbackError, ConfigResult, RuleFailure, RuntimeError};
use crate::plugin::{PluginSet, PluginSetup};
use crate::privacy::PrivacyGate;
use crate::registry::SensorRegistry;
use crate::sensor::{SampleSource, Sensor, SensorBuilder};
use crate::time::{MonotonicTime, TimeSource, Timestamp};

/// Lifecycle state of a [`Scheduler`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SchedulerState {
    Stopped = 0,
    Running = 1,
    Stopping = 2,
}

impl SchedulerState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => SchedulerState::Running,
            2 => SchedulerState::Stopping,
            _ => SchedulerState::Stopped,
        }
    }
}

/// Handle identifying a registered rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(pub usize);

/// Rule callback; zero arguments, invoked on rising edges only
pub type Callback = Box<dyn FnMut() -> Result<(), CallbackError> + Send>;

struct Rule {
    id: RuleId,
    name: String,
    condition: Condition,
    callback: Callback,
    edge: EdgeDetector,
    fired: u64,
}

/// Outcome of one evaluation pass
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub now: Timestamp,
    /// Rules whose callback was invoked, in invocation order
    pub fired: Vec<RuleId>,
    /// Per-rule failures (source reads, evaluation panics, callbacks)
    pub failures: Vec<RuleFailure>,
    /// Registry poll failures not tied to a rule
    pub sensor_failures: Vec<ReadFailure>,
}

impl TickReport {
    fn new(now: Timestamp) -> Self {
        Self {
            now,
            fired: Vec::new(),
            failures: Vec::new(),
            sensor_failures: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.sensor_failures.is_empty()
    }

    pub fn has_fired(&self, rule: RuleId) -> bool {
        self.fired.contains(&rule)
    }
}

/// Cumulative counters since construction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub ticks: u64,
    pub fired: u64,
    pub failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    ticks: AtomicU64,
    fired: AtomicU64,
    failures: AtomicU64,
}

impl Counters {
    fn record(&self, report: &TickReport) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        self.fired
            .fetch_add(report.fired.len() as u64, Ordering::Relaxed);
        self.failures.fetch_add(
            (report.failures.len() + report.sensor_failures.len()) as u64,
            Ordering::Relaxed,
        );
    }

    fn snapshot(&self) -> SchedulerStats {
        SchedulerStats {
            ticks: self.ticks.load(Ordering::Relaxed),
            fired: self.fired.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// Everything a tick needs, shareable with the loop thread
#[derive(Clone)]
struct Engine {
    clock: Arc<dyn TimeSource>,
    registry: Arc<SensorRegistry>,
    privacy: Arc<PrivacyGate>,
    rules: Arc<Mutex<Vec<Rule>>>,
    counters: Arc<Counters>,
    log_samples: bool,
    summary_window: usize,
    summary_precision: usize,
}

impl Engine {
    fn run_tick(&self) -> TickReport {
        let now = self.clock.now();
        let mut ctx = EvalContext::new(now);
        let mut report = TickReport::new(now);

        for sensor in self.registry.list_all() {
            if sensor.is_due(now) {
                self.poll_sensor(&sensor, now, &mut report);
            }
        }

        let mut rules = self.rules.lock();
        for rule in rules.iter_mut() {
            evaluate_rule(rule, &mut ctx, &mut report);
        }
        drop(rules);

        self.counters.record(&report);
        report
    }

    fn poll_sensor(&self, sensor: &Sensor, now: Timestamp, report: &mut TickReport) {
        match sensor.read_at(now) {
            Ok(value) if self.log_samples => {
                let shown = self.privacy.format_sensor(sensor, value);
                if sensor.is_private() {
                    trace!("{} = {}", sensor.name(), shown);
                } else {
                    trace!(
                        "{} = {} [{}]",
                        sensor.name(),
                        shown,
                        sensor.summary_text(self.summary_window, self.summary_precision)
                    );
                }
            }
            Ok(_) => {}
            Err(error) => {
                warn!("reading sensor {:?} failed: {}", sensor.name(), error);
                report.sensor_failures.push(ReadFailure {
                    sensor: sensor.name().to_string(),
                    error,
                });
            }
        }
    }
}

fn evaluate_rule(rule: &mut Rule, ctx: &mut EvalContext, report: &mut TickReport) {
    let current = match catch_unwind(AssertUnwindSafe(|| rule.condition.evaluate(ctx))) {
        Ok(value) => value,
        Err(payload) => {
            let reason = panic_message(payload.as_ref());
            error!("rule {:?}: condition panicked: {}", rule.name, reason);
            report.failures.push(RuleFailure::Evaluation {
                rule: rule.name.clone(),
                reason,
            });
            false
        }
    };

    for failure in ctx.take_failures() {
        warn!(
            "rule {:?}: reading {:?} failed: {}",
            rule.name, failure.sensor, failure.error
        );
        report.failures.push(RuleFailure::SourceRead {
            rule: rule.name.clone(),
            sensor: failure.sensor,
            error: failure.error,
        });
    }

    if !rule.edge.detect(current) {
        return;
    }

    debug!("rule {:?} fired at {} ms", rule.name, ctx.now());
    rule.fired += 1;
    report.fired.push(rule.id);

    let outcome = match catch_unwind(AssertUnwindSafe(|| (rule.callback)())) {
        Ok(result) => result,
        Err(payload) => Err(CallbackError::Panicked(panic_message(payload.as_ref()))),
    };
    if let Err(error) = outcome {
        error!("rule {:?}: {}", rule.name, error);
        report.failures.push(RuleFailure::Callback {
            rule: rule.name.clone(),
            error,
        });
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        String::from("non-string panic payload")
    }
}

struct Worker {
    handle: JoinHandle<()>,
    stop_tx: Sender<()>,
}

/// Rule registry and periodic evaluation loop
///
/// ```rust
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use tripwire_core::{Condition, RuntimeConfig, Scheduler};
///
/// let mut scheduler = Scheduler::new(RuntimeConfig::default()).unwrap();
/// let hits = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&hits);
///
/// let mut armed = false;
/// scheduler
///     .register("demo", Condition::new(move || std::mem::replace(&mut armed, true)), move || {
///         counter.fetch_add(1, Ordering::SeqCst);
///     })
///     .unwrap();
///
/// scheduler.tick().unwrap();
/// assert_eq!(hits.load(Ordering::SeqCst), 1);
/// ```
pub struct Scheduler {
    config: RuntimeConfig,
    engine: Engine,
    plugins: PluginSet,
    state: Arc<AtomicU8>,
    worker: Option<Worker>,
    next_rule: usize,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::build(RuntimeConfig::default(), Arc::new(MonotonicTime::new()))
    }
}

impl Scheduler {
    /// Validates `config` and creates a stopped scheduler on a monotonic clock
    pub fn new(config: RuntimeConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self::build(config, Arc::new(MonotonicTime::new())))
    }

    fn build(config: RuntimeConfig, clock: Arc<dyn TimeSource>) -> Self {
        let engine = Engine {
            clock,
            registry: Arc::new(SensorRegistry::new()),
            privacy: Arc::new(PrivacyGate::new(config.redaction_marker.clone())),
            rules: Arc::new(Mutex::new(Vec::new())),
            counters: Arc::new(Counters::default()),
            log_samples: config.log_samples,
            summary_window: config.summary_window,
            summary_precision: config.summary_precision,
        };

        Self {
            config,
            engine,
            plugins: PluginSet::new(),
            state: Arc::new(AtomicU8::new(SchedulerState::Stopped as u8)),
            worker: None,
            next_rule: 0,
        }
    }

    /// Replaces the clock used for pass timestamps and registered sensors
    pub fn with_clock(mut self, clock: Arc<dyn TimeSource>) -> Self {
        self.engine.clock = clock;
        self.bind_sensors();
        self
    }

    /// Shares an existing registry instead of the scheduler's own
    ///
    /// Its sensors are rebound to this scheduler's clock.
    pub fn with_registry(mut self, registry: Arc<SensorRegistry>) -> Self {
        self.engine.registry = registry;
        self.bind_sensors();
        self
    }

    fn bind_sensors(&self) {
        for sensor in self.engine.registry.list_all() {
            sensor.bind_clock(Arc::clone(&self.engine.clock));
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn state(&self) -> SchedulerState {
        SchedulerState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn is_running(&self) -> bool {
        self.state() == SchedulerState::Running
    }

    pub fn registry(&self) -> &Arc<SensorRegistry> {
        &self.engine.registry
    }

    pub fn privacy_gate(&self) -> &Arc<PrivacyGate> {
        &self.engine.privacy
    }

    pub fn clock(&self) -> &Arc<dyn TimeSource> {
        &self.engine.clock
    }

    pub fn stats(&self) -> SchedulerStats {
        self.engine.counters.snapshot()
    }

    /// Sensor builder bound to this scheduler's clock, history capacity and
    /// summary window
    pub fn sensor_builder<S: SampleSource + 'static>(
        &self,
        name: impl Into<String>,
        source: S,
    ) -> SensorBuilder {
        Sensor::builder(name, source)
            .clock(Arc::clone(&self.engine.clock))
            .history_capacity(self.config.history_capacity)
            .summary_window(self.config.summary_window)
    }

    /// Adds a sensor to the registry and binds it to the scheduler's clock
    pub fn add_sensor(&self, sensor: Arc<Sensor>) -> ConfigResult<()> {
        self.engine.registry.add(Arc::clone(&sensor))?;
        sensor.bind_clock(Arc::clone(&self.engine.clock));
        Ok(())
    }

    fn ensure_stopped(&self) -> Result<(), RuntimeError> {
        match self.state() {
            SchedulerState::Stopped => Ok(()),
            other => Err(RuntimeError::NotStopped(other)),
        }
    }

    /// Registers a rule with an infallible callback
    pub fn register<F>(
        &mut self,
        name: impl Into<String>,
        condition: Condition,
        mut callback: F,
    ) -> Result<RuleId, RuntimeError>
    where
        F: FnMut() + Send + 'static,
    {
        self.register_fallible(name, condition, move || {
            callback();
            Ok(())
        })
    }

    /// Registers a rule whose callback may report an error
    pub fn register_fallible<F>(
        &mut self,
        name: impl Into<String>,
        condition: Condition,
        callback: F,
    ) -> Result<RuleId, RuntimeError>
    where
        F: FnMut() -> Result<(), CallbackError> + Send + 'static,
    {
        self.ensure_stopped()?;

        let name = name.into();
        let mut ctx = EvalContext::new(self.engine.clock.now());
        let initial = match catch_unwind(AssertUnwindSafe(|| condition.evaluate(&mut ctx))) {
            Ok(value) => value,
            Err(payload) => {
                error!(
                    "rule {:?}: condition panicked during registration: {}",
                    name,
                    panic_message(payload.as_ref())
                );
                false
            }
        };
        for failure in ctx.take_failures() {
            debug!(
                "rule {:?}: initial read of {:?} failed: {}",
                name, failure.sensor, failure.error
            );
        }

        let id = RuleId(self.next_rule);
        self.next_rule += 1;
        debug!("registered rule {name:?} (initially {initial})");

        self.engine.rules.lock().push(Rule {
            id,
            name,
            condition,
            callback: Box::new(callback),
            edge: EdgeDetector::seeded(initial),
            fired: 0,
        });
        Ok(id)
    }

    pub fn rule_count(&self) -> usize {
        self.engine.rules.lock().len()
    }

    /// Rule names in registration (evaluation) order
    pub fn rule_names(&self) -> Vec<String> {
        self.engine
            .rules
            .lock()
            .iter()
            .map(|r| r.name.clone())
            .collect()
    }

    /// Number of times a rule's callback has been invoked
    pub fn fire_count(&self, rule: RuleId) -> Option<u64> {
        self.engine
            .rules
            .lock()
            .iter()
            .find(|r| r.id == rule)
            .map(|r| r.fired)
    }

    /// Queues a one-shot setup plugin; duplicate names are ignored
    pub fn add_plugin<F>(&mut self, name: impl Into<String>, setup: F) -> bool
    where
        F: FnOnce(&mut Scheduler) -> Result<(), RuntimeError> + Send + 'static,
    {
        let setup: PluginSetup = Box::new(setup);
        self.plugins.register(name, setup)
    }

    /// Forgets registered plugin names and drops plugins that have not run
    pub fn reset_plugins(&mut self) {
        self.plugins.reset();
    }

    pub fn plugin_names(&self) -> &[String] {
        self.plugins.names()
    }

    fn run_plugins(&mut self) -> Result<(), RuntimeError> {
        loop {
            let pending = self.plugins.take_pending();
            if pending.is_empty() {
                return Ok(());
            }

            let mut queue = pending.into_iter();
            while let Some(plugin) = queue.next() {
                let name = plugin.name().to_string();
                debug!("running plugin {name:?}");
                if let Err(e) = plugin.run(self) {
                    self.plugins.restore(queue.collect());
                    return Err(RuntimeError::Plugin {
                        name,
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    /// Runs one evaluation pass on the calling thread
    pub fn tick(&mut self) -> Result<TickReport, RuntimeError> {
        self.ensure_stopped()?;
        self.run_plugins()?;
        Ok(self.engine.run_tick())
    }

    /// Starts the loop with the configured poll interval
    pub fn start_configured(&mut self) -> Result<(), RuntimeError> {
        self.start(self.config.poll_interval_ms)
    }

    /// Runs pending plugins, then starts ticking every `poll_interval_ms`
    pub fn start(&mut self, poll_interval_ms: u64) -> Result<(), RuntimeError> {
        validate_poll_interval(poll_interval_ms)?;
        self.ensure_stopped()?;
        self.run_plugins()?;

        let engine = self.engine.clone();
        let period = Duration::from_millis(poll_interval_ms);
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let handle = thread::Builder::new()
            .name("tripwire-tick".into())
            .spawn(move || loop {
                let started = Instant::now();
                engine.run_tick();

                let wait = period.saturating_sub(started.elapsed());
                match stop_rx.recv_timeout(wait) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;

        self.state
            .store(SchedulerState::Running as u8, Ordering::SeqCst);
        self.worker = Some(Worker { handle, stop_tx });
        debug!(
            "scheduler started: {} rules, {} ms period",
            self.rule_count(),
            poll_interval_ms
        );
        Ok(())
    }

    /// Stops the loop after the tick in flight; no-op when already stopped
    pub fn stop(&mut self) -> Result<(), RuntimeError> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };

        self.state
            .store(SchedulerState::Stopping as u8, Ordering::SeqCst);
        // A send error means the loop already exited.
        let _ = worker.stop_tx.send(());
        let joined = worker.handle.join();
        self.state
            .store(SchedulerState::Stopped as u8, Ordering::SeqCst);

        match joined {
            Ok(()) => {
                debug!("scheduler stopped after {} ticks", self.stats().ticks);
                Ok(())
            }
            Err(_) => Err(RuntimeError::LoopPanicked),
        }
    }

    /// Stops the loop and consumes the scheduler
    pub fn shutdown(mut self) -> Result<SchedulerStats, RuntimeError> {
        self.stop()?;
        Ok(self.stats())
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            error!("scheduler shutdown failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::ManualTime;
    use std::sync::atomic::{AtomicBool, AtomicUsize};

    fn manual() -> (Scheduler, Arc<ManualTime>) {
        let clock = Arc::new(ManualTime::new(0));
        let scheduler = Scheduler::default().with_clock(clock.clone());
        (scheduler, clock)
    }

    fn switch(initial: bool) -> (Condition, Arc<AtomicBool>) {
        let flag = Arc::new(AtomicBool::new(initial));
        let read = Arc::clone(&flag);
        (Condition::new(move || read.load(Ordering::SeqCst)), flag)
    }

    #[test]
    fn state_round_trip() {
        for state in [
            SchedulerState::Stopped,
            SchedulerState::Running,
            SchedulerState::Stopping,
        ] {
            assert_eq!(SchedulerState::from_u8(state as u8), state);
        }
    }

    #[test]
    fn registration_does_not_fire() {
        let (mut scheduler, clock) = manual();
        let (cond, _) = switch(true);
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        let id = scheduler
            .register("already_true", cond, move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        clock.advance(100);
        let report = scheduler.tick().unwrap();
        assert!(!report.has_fired(id));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn fires_on_each_rising_edge() {
        let (mut scheduler, clock) = manual();
        let (cond, flag) = switch(false);
        let id = scheduler.register("edge", cond, || {}).unwrap();

        let mut fired = Vec::new();
        for value in [true, true, false, true] {
            flag.store(value, Ordering::SeqCst);
            clock.advance(100);
            fired.push(scheduler.tick().unwrap().has_fired(id));
        }
        assert_eq!(fired, vec![true, false, false, true]);
        assert_eq!(scheduler.fire_count(id), Some(2));
        assert_eq!(scheduler.stats().ticks, 4);
    }

    #[test]
    fn rules_run_in_registration_order() {
        let (mut scheduler, _) = manual();
        let order = Arc::new(Mutex::new(Vec::new()));

        for name in ["first", "second", "third"] {
            let (cond, flag) = switch(false);
            let log = Arc::clone(&order);
            scheduler
                .register(name, cond, move || log.lock().push(name))
                .unwrap();
            flag.store(true, Ordering::SeqCst);
        }

        scheduler.tick().unwrap();
        assert_eq!(*order.lock(), vec!["first", "second", "third"]);
        assert_eq!(scheduler.rule_names(), vec!["first", "second", "third"]);
    }

    #[test]
    fn panicking_callback_is_contained() {
        let (mut scheduler, _) = manual();
        let (bad, bad_flag) = switch(false);
        let (good, good_flag) = switch(false);
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        scheduler
            .register("bad", bad, || panic!("boom"))
            .unwrap();
        let good_id = scheduler
            .register("good", good, move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        bad_flag.store(true, Ordering::SeqCst);
        good_flag.store(true, Ordering::SeqCst);
        let report = scheduler.tick().unwrap();

        assert!(report.has_fired(good_id));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(
            report.failures,
            vec![RuleFailure::Callback {
                rule: "bad".into(),
                error: CallbackError::Panicked("boom".into()),
            }]
        );
    }

    #[test]
    fn panicking_condition_counts_as_false() {
        let (mut scheduler, _) = manual();
        let armed = Arc::new(AtomicBool::new(false));
        let trigger = Arc::clone(&armed);
        let cond = Condition::new(move || {
            if trigger.load(Ordering::SeqCst) {
                panic!("sensor math overflow");
            }
            false
        });
        let id = scheduler.register("fragile", cond, || {}).unwrap();

        armed.store(true, Ordering::SeqCst);
        let report = scheduler.tick().unwrap();
        assert!(!report.has_fired(id));
        assert!(matches!(
            &report.failures[0],
            RuleFailure::Evaluation { rule, .. } if rule == "fragile"
        ));
    }

    #[test]
    fn plugins_run_once_before_first_tick() {
        let (mut scheduler, _) = manual();
        let runs = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&runs);
        assert!(scheduler.add_plugin("setup", move |s: &mut Scheduler| {
            counter.fetch_add(1, Ordering::SeqCst);
            s.register("from_plugin", Condition::new(|| false), || {})?;
            Ok(())
        }));
        assert!(!scheduler.add_plugin("setup", |_: &mut Scheduler| Ok(())));

        scheduler.tick().unwrap();
        scheduler.tick().unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.rule_names(), vec!["from_plugin"]);
    }

    #[test]
    fn failing_plugin_keeps_scheduler_stopped() {
        let (mut scheduler, _) = manual();
        scheduler.add_plugin("broken", |_: &mut Scheduler| {
            Err(RuntimeError::Plugin {
                name: "broken".into(),
                reason: "device missing".into(),
            })
        });

        let err = scheduler.start(10).unwrap_err();
        assert!(matches!(err, RuntimeError::Plugin { ref name, .. } if name == "broken"));
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[test]
    fn invalid_poll_interval_rejected() {
        let (mut scheduler, _) = manual();
        assert!(matches!(
            scheduler.start(0),
            Err(RuntimeError::Configuration(_))
        ));
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[test]
    fn stop_is_idempotent() {
        let mut scheduler = Scheduler::default();
        scheduler.stop().unwrap();
        scheduler.start(5).unwrap();
        assert!(scheduler.is_running());
        scheduler.stop().unwrap();
        scheduler.stop().unwrap();
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[test]
    fn register_while_running_is_rejected() {
        let mut scheduler = Scheduler::default();
        scheduler.start(5).unwrap();
        let err = scheduler
            .register("late", Condition::new(|| true), || {})
            .unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::NotStopped(SchedulerState::Running)
        ));
        assert!(matches!(scheduler.tick(), Err(RuntimeError::NotStopped(_))));
        scheduler.stop().unwrap();
    }

    #[test]
    fn panicking_condition_at_registration_seeds_false() {
        let (mut scheduler, clock) = manual();
        let id = scheduler
            .register("explodes", Condition::new(|| panic!("boom")), || {})
            .unwrap();
        assert_eq!(scheduler.rule_count(), 1);

        clock.advance(100);
        let report = scheduler.tick().unwrap();
        assert!(!report.has_fired(id));
        assert_eq!(
            report.failures,
            vec![RuleFailure::Evaluation {
                rule: "explodes".into(),
                reason: "boom".into(),
            }]
        );
    }

    #[test]
    fn rate_limited_sensors_are_polled_when_due() {
        use crate::sensor::FnSource;

        let (mut scheduler, clock) = manual();
        let counts: Vec<Arc<AtomicUsize>> = (0..2).map(|_| Arc::new(AtomicUsize::new(0))).collect();
        for (name, hz, count) in [("fast", 10.0, &counts[0]), ("slow", 2.0, &counts[1])] {
            let count = Arc::clone(count);
            let sensor = scheduler
                .sensor_builder(
                    name,
                    FnSource::new(move || count.fetch_add(1, Ordering::SeqCst) as f64),
                )
                .hz(hz)
                .build()
                .unwrap();
            scheduler.add_sensor(sensor).unwrap();
        }

        for _ in 0..10 {
            clock.advance(100);
            scheduler.tick().unwrap();
        }
        assert_eq!(counts[0].load(Ordering::SeqCst), 10);
        assert_eq!(counts[1].load(Ordering::SeqCst), 2);
    }

    #[test]
    fn added_sensors_follow_scheduler_clock() {
        use crate::sensor::FnSource;

        let (mut scheduler, clock) = manual();
        clock.set(1_000);
        let reads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&reads);
        let sensor = Sensor::builder(
            "temp",
            FnSource::new(move || counter.fetch_add(1, Ordering::SeqCst) as f64),
        )
        .clock(Arc::new(ManualTime::new(500_000)))
        .build()
        .unwrap();
        scheduler.add_sensor(Arc::clone(&sensor)).unwrap();

        sensor.read().unwrap();
        assert_eq!(sensor.last_sample().unwrap().timestamp, 1_000);
        for _ in 0..3 {
            clock.advance(100);
            scheduler.tick().unwrap();
        }
        assert_eq!(reads.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn sensor_builder_uses_scheduler_clock() {
        let (scheduler, clock) = manual();
        clock.set(42_000);
        let sensor = scheduler
            .sensor_builder("temp", crate::sensor::FnSource::new(|| 20.0))
            .build()
            .unwrap();
        sensor.read().unwrap();
        assert_eq!(sensor.last_sample().unwrap().timestamp, 42_000);
        assert_eq!(
            sensor.with_history(|h| h.tracked_window()),
            Some(scheduler.config().summary_window.min(scheduler.config().history_capacity))
        );
    }
}
