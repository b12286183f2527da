//! Ordered Events with `sequence`
//!
//! A smart-home entry routine: motion outside, then the door, then motion
//! inside, all within 15 seconds. Events are simulated on a manual clock so
//! the run is instant and repeatable.
//!
//! ## What You'll Learn
//!
//! - Wrapping plain flags as sensors
//! - Building a `sequence` and registering a rule on it
//! - Driving the scheduler tick by tick
//!
//! ## Running the Example
//!
//! ```bash
//! cargo run --example 01_entry_sequence
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tripwire_core::sensor::FnSource;
use tripwire_core::{sequence, Condition, ManualTime, Scheduler};

fn flag_sensor(
    scheduler: &Scheduler,
    name: &str,
) -> Result<(Arc<AtomicBool>, Condition), Box<dyn std::error::Error>> {
    let flag = Arc::new(AtomicBool::new(false));
    let reader = Arc::clone(&flag);
    let sensor = scheduler
        .sensor_builder(
            name,
            FnSource::new(move || if reader.load(Ordering::SeqCst) { 1.0 } else { 0.0 }),
        )
        .metadata("kind", "event")
        .build()?;
    scheduler.add_sensor(Arc::clone(&sensor))?;
    Ok((flag, Condition::sensor(&sensor, |v| v > 0.5)))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Tripwire Entry Sequence Example");
    println!("===============================\n");

    let clock = Arc::new(ManualTime::new(0));
    let mut scheduler = Scheduler::default().with_clock(clock.clone());

    let (outside, outside_seen) = flag_sensor(&scheduler, "motion_outside")?;
    let (door, door_opened) = flag_sensor(&scheduler, "door")?;
    let (inside, inside_seen) = flag_sensor(&scheduler, "motion_inside")?;

    let entry = sequence(vec![outside_seen, door_opened, inside_seen], 15.0)?;
    scheduler.register("welcome_home", entry, || {
        println!("  -> welcome home routine triggered");
    })?;

    // (second, event) pairs; the second run is too slow to count
    let script: [(u64, &Arc<AtomicBool>); 6] = [
        (1, &outside),
        (4, &door),
        (8, &inside),
        (30, &outside),
        (35, &door),
        (50, &inside),
    ];

    for (second, flag) in script {
        clock.set(second * 1000);
        flag.store(true, Ordering::SeqCst);
        let report = scheduler.tick()?;
        println!(
            "t={second:>2}s  fired={}",
            if report.fired.is_empty() { "no" } else { "yes" }
        );

        flag.store(false, Ordering::SeqCst);
        clock.advance(100);
        scheduler.tick()?;
    }

    println!("\nTicks run: {}", scheduler.stats().ticks);
    Ok(())
}
