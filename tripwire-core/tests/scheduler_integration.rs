//! Integration tests for the scheduler lifecycle and failure isolation

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{manual_scheduler, CallCounter, CountingSource, ScriptedSource, Step, Switch};
use tripwire_core::errors::{CallbackError, RuleFailure, SourceError};
use tripwire_core::sensor::FnSource;
use tripwire_core::{
    Condition, RuntimeConfig, RuntimeError, Scheduler, SchedulerState, Sensor, SensorRegistry,
};

const WAIT: Duration = Duration::from_secs(2);

#[test]
fn failing_callback_does_not_block_other_rules() {
    let (mut scheduler, clock) = manual_scheduler();
    let trigger = Switch::new(false);
    let healthy = CallCounter::new();

    let failing = scheduler
        .register_fallible("failing", trigger.condition(), || {
            Err(CallbackError::failed("notification service down"))
        })
        .unwrap();
    let ok = scheduler
        .register("healthy", trigger.condition(), healthy.callback())
        .unwrap();

    // Tick N
    trigger.set(true);
    clock.advance(100);
    let report = scheduler.tick().unwrap();
    assert!(report.has_fired(failing));
    assert!(report.has_fired(ok));
    assert_eq!(healthy.count(), 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].rule(), "failing");

    // Tick N+1: both re-arm and fire again on a new edge
    trigger.set(false);
    clock.advance(100);
    scheduler.tick().unwrap();
    trigger.set(true);
    clock.advance(100);
    let report = scheduler.tick().unwrap();
    assert!(report.has_fired(ok));
    assert_eq!(healthy.count(), 2);
    assert_eq!(scheduler.fire_count(failing), Some(2));
}

#[test]
fn source_failure_makes_leaf_false_and_is_reported() {
    let (mut scheduler, clock) = manual_scheduler();
    let sensor = scheduler
        .sensor_builder(
            "door",
            ScriptedSource::new(vec![
                Step::Value(0.0),
                Step::Fail("bus timeout"),
                Step::Fail("bus timeout"),
                Step::Fail("bus timeout"),
                Step::Value(1.0),
            ]),
        )
        .build()
        .unwrap();

    let opened = CallCounter::new();
    scheduler
        .register(
            "door_open",
            Condition::sensor(&sensor, |v| v > 0.5),
            opened.callback(),
        )
        .unwrap();

    clock.advance(100);
    let report = scheduler.tick().unwrap();
    assert_eq!(opened.count(), 0);
    assert!(matches!(
        &report.failures[0],
        RuleFailure::SourceRead { rule, sensor, error: SourceError::Unavailable(_) }
            if rule == "door_open" && sensor == "door"
    ));

    clock.advance(100);
    scheduler.tick().unwrap();
    clock.advance(100);
    scheduler.tick().unwrap();

    clock.advance(100);
    let report = scheduler.tick().unwrap();
    assert!(report.is_clean());
    assert_eq!(opened.count(), 1);
}

#[test]
fn registry_poll_failures_are_reported_separately() {
    let (mut scheduler, clock) = manual_scheduler();
    let flaky = scheduler
        .sensor_builder("flaky", ScriptedSource::new(vec![Step::Fail("unplugged")]))
        .build()
        .unwrap();
    scheduler.add_sensor(flaky).unwrap();

    clock.advance(100);
    let report = scheduler.tick().unwrap();
    assert!(report.failures.is_empty());
    assert_eq!(report.sensor_failures.len(), 1);
    assert_eq!(report.sensor_failures[0].sensor, "flaky");
    assert_eq!(scheduler.stats().failures, 1);
}

#[test]
fn loop_fires_on_rising_edge_and_stops() {
    let mut scheduler = Scheduler::new(RuntimeConfig::default()).unwrap();
    let trigger = Switch::new(false);
    let hits = CallCounter::new();
    scheduler
        .register("edge", trigger.condition(), hits.callback())
        .unwrap();

    scheduler.start(5).unwrap();
    assert_eq!(scheduler.state(), SchedulerState::Running);

    trigger.set(true);
    assert!(hits.wait_for(1, WAIT));

    // Held true: no further callbacks
    std::thread::sleep(Duration::from_millis(30));
    assert_eq!(hits.count(), 1);

    scheduler.stop().unwrap();
    assert_eq!(scheduler.state(), SchedulerState::Stopped);

    let ticks = scheduler.stats().ticks;
    std::thread::sleep(Duration::from_millis(30));
    assert_eq!(scheduler.stats().ticks, ticks);
}

#[test]
fn restart_keeps_rules_and_skips_plugins() {
    let mut scheduler = Scheduler::default();
    let plugin_runs = CallCounter::new();
    let runs = plugin_runs.clone();
    scheduler.add_plugin("setup", move |_: &mut Scheduler| {
        runs.hit();
        Ok(())
    });

    let trigger = Switch::new(false);
    let hits = CallCounter::new();
    scheduler
        .register("edge", trigger.condition(), hits.callback())
        .unwrap();

    scheduler.start(5).unwrap();
    scheduler.stop().unwrap();
    scheduler.start(5).unwrap();

    trigger.set(true);
    assert!(hits.wait_for(1, WAIT));
    scheduler.stop().unwrap();

    assert_eq!(plugin_runs.count(), 1);
    assert_eq!(scheduler.rule_count(), 1);
}

#[test]
fn plugins_run_in_registration_order_with_scheduler_access() {
    let (mut scheduler, _) = manual_scheduler();
    let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

    for name in ["sensors", "rules", "alerts"] {
        let log = Arc::clone(&order);
        scheduler.add_plugin(name, move |s: &mut Scheduler| {
            log.lock().push(name);
            s.register(name, Condition::new(|| false), || {})?;
            Ok(())
        });
    }

    scheduler.tick().unwrap();
    assert_eq!(*order.lock(), vec!["sensors", "rules", "alerts"]);
    assert_eq!(scheduler.rule_names(), vec!["sensors", "rules", "alerts"]);
    assert_eq!(scheduler.plugin_names(), ["sensors", "rules", "alerts"]);
}

#[test]
fn reset_plugins_drops_unrun_plugins() {
    let (mut scheduler, _) = manual_scheduler();
    let runs = CallCounter::new();
    let hits = runs.clone();
    scheduler.add_plugin("once", move |_: &mut Scheduler| {
        hits.hit();
        Ok(())
    });
    scheduler.reset_plugins();

    scheduler.tick().unwrap();
    assert_eq!(runs.count(), 0);
    assert!(scheduler.plugin_names().is_empty());
}

#[test]
fn callbacks_can_look_up_sensors_while_running() {
    let registry = Arc::new(SensorRegistry::new());
    let mut scheduler = Scheduler::default().with_registry(Arc::clone(&registry));

    let level = scheduler
        .sensor_builder("level", ScriptedSource::values(&[7.0]))
        .build()
        .unwrap();
    scheduler.add_sensor(level).unwrap();

    let trigger = Switch::new(false);
    let seen = Arc::new(parking_lot::Mutex::new(None));
    let slot = Arc::clone(&seen);
    let lookup = Arc::clone(&registry);
    scheduler
        .register("inspect", trigger.condition(), move || {
            if let Ok(sensor) = lookup.get("level") {
                *slot.lock() = sensor.latest();
            }
        })
        .unwrap();

    scheduler.start(5).unwrap();
    trigger.set(true);

    let deadline = std::time::Instant::now() + WAIT;
    while seen.lock().is_none() && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(2));
    }
    scheduler.stop().unwrap();

    assert_eq!(*seen.lock(), Some(7.0));
    assert!(registry.contains("level"));
}

#[test]
fn start_twice_is_rejected() {
    let mut scheduler = Scheduler::default();
    scheduler.start(5).unwrap();
    assert!(matches!(
        scheduler.start(5),
        Err(RuntimeError::NotStopped(SchedulerState::Running))
    ));
    scheduler.shutdown().unwrap();
}

#[test]
fn drop_stops_running_loop() {
    let hits = CallCounter::new();
    {
        let mut scheduler = Scheduler::default();
        scheduler
            .register("tick", Condition::new(|| true), hits.callback())
            .unwrap();
        scheduler.start(5).unwrap();
    }
    assert_eq!(hits.count(), 0);
}

#[test]
fn start_configured_uses_config_interval() {
    let config = RuntimeConfig {
        poll_interval_ms: 5,
        ..Default::default()
    };
    let mut scheduler = Scheduler::new(config).unwrap();
    scheduler.start_configured().unwrap();
    let ticked = (0..500).any(|_| {
        std::thread::sleep(Duration::from_millis(2));
        scheduler.stats().ticks >= 2
    });
    scheduler.stop().unwrap();
    assert!(ticked);
}

#[test]
fn failing_sensor_is_read_once_per_tick() {
    let (mut scheduler, clock) = manual_scheduler();
    let (source, reads) = CountingSource::new(ScriptedSource::new(vec![Step::Fail("i2c nack")]));
    let gauge = scheduler.sensor_builder("pressure", source).build().unwrap();
    scheduler.add_sensor(Arc::clone(&gauge)).unwrap();

    let low = Condition::sensor(&gauge, |v| v < 900.0);
    let high = Condition::sensor(&gauge, |v| v > 1100.0);
    scheduler.register("out_of_band", low | high, || {}).unwrap();
    let at_registration = reads.count();

    clock.advance(100);
    let report = scheduler.tick().unwrap();
    assert_eq!(reads.count() - at_registration, 1);
    assert_eq!(report.sensor_failures.len(), 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].rule(), "out_of_band");
}

#[test]
fn sensor_read_outside_loop_does_not_stall_ticks() {
    std::thread::sleep(Duration::from_millis(500));
    let registry = Arc::new(SensorRegistry::new());
    let (source, reads) = CountingSource::new(FnSource::new(|| 21.5));
    let sensor = Sensor::builder("room", source).build().unwrap();
    registry.add(Arc::clone(&sensor)).unwrap();
    let mut scheduler = Scheduler::default().with_registry(Arc::clone(&registry));

    sensor.read().unwrap();
    let before = reads.count();
    for _ in 0..3 {
        std::thread::sleep(Duration::from_millis(100));
        scheduler.tick().unwrap();
    }
    assert_eq!(reads.count() - before, 3);
    assert_eq!(sensor.history_len(), 4);
}

#[test]
fn poll_rates_set_read_ratio() {
    let (mut scheduler, clock) = manual_scheduler();
    let mut counters = Vec::new();
    for (name, hz) in [("imu", 10.0), ("battery", 2.0)] {
        let (source, reads) = CountingSource::new(FnSource::new(|| 1.0));
        let sensor = scheduler.sensor_builder(name, source).hz(hz).build().unwrap();
        scheduler.add_sensor(sensor).unwrap();
        counters.push(reads);
    }

    for _ in 0..200 {
        clock.advance(10);
        scheduler.tick().unwrap();
    }
    assert_eq!(counters[0].count(), 20);
    assert_eq!(counters[1].count(), 4);
}
