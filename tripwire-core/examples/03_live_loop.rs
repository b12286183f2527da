//! Running the Tick Loop on a Background Thread
//!
//! A plugin registers a temperature sensor and a sustained-heat rule. The
//! loop then runs in real time for about two seconds.
//!
//! ## What You'll Learn
//!
//! - Setting up sensors and rules from a plugin
//! - `within` over a noisy signal
//! - Starting, stopping and collecting statistics
//!
//! ## Running the Example
//!
//! ```bash
//! cargo run --example 03_live_loop
//! ```

use std::time::Duration;

use tripwire_core::sensor::FnSource;
use tripwire_core::{within, Condition, RuntimeConfig, Scheduler};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Tripwire Live Loop Example");
    println!("==========================\n");

    let config = RuntimeConfig {
        poll_interval_ms: 50,
        ..Default::default()
    };
    let mut scheduler = Scheduler::new(config)?;

    scheduler.add_plugin("boiler", |s: &mut Scheduler| {
        let mut tick = 0u32;
        let boiler = s
            .sensor_builder(
                "boiler_temp",
                FnSource::new(move || {
                    tick += 1;
                    // Ramps from 60 to ~100 over 2 s, with a small wobble
                    60.0 + f64::from(tick) + if tick % 3 == 0 { -1.5 } else { 0.5 }
                }),
            )
            .metadata("unit", "celsius")
            .build()?;
        s.add_sensor(boiler.clone())?;

        let hot = within(0.5, Condition::sensor(&boiler, |t| t > 80.0))?;
        s.register("boiler_overheat", hot, || {
            println!("  -> boiler above 80 C for half a second");
        })?;
        Ok(())
    });

    scheduler.start_configured()?;
    std::thread::sleep(Duration::from_secs(2));
    let stats = scheduler.shutdown()?;

    println!(
        "\nticks={} fired={} failures={}",
        stats.ticks, stats.fired, stats.failures
    );
    Ok(())
}
