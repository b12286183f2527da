//! Fusing Public and Private Sensors
//!
//! Combines a private camera-based occupancy estimate with a public motion
//! sensor. The fused sensor inherits the private label, so every value shown
//! through the privacy gate is redacted.
//!
//! ## What You'll Learn
//!
//! - `Sensor::fused` with average and weighted strategies
//! - How privacy propagates through fusion
//! - Rendering rolling summaries
//!
//! ## Running the Example
//!
//! ```bash
//! cargo run --example 02_private_fusion
//! ```

use std::sync::Arc;

use tripwire_core::sensor::FnSource;
use tripwire_core::{FusionStrategy, ManualTime, Scheduler, Sensor, TimeSource};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Tripwire Private Fusion Example");
    println!("===============================\n");

    let clock = Arc::new(ManualTime::new(0));
    let scheduler = Scheduler::default().with_clock(clock.clone());

    let mut frame = 0u32;
    let camera = scheduler
        .sensor_builder(
            "occupancy_cam",
            FnSource::new(move || {
                frame += 1;
                if frame % 4 == 0 { 0.0 } else { 1.0 }
            }),
        )
        .private()
        .metadata("location", "living_room")
        .build()?;

    let mut step = 0u32;
    let motion = scheduler
        .sensor_builder(
            "hallway_pir",
            FnSource::new(move || {
                step += 1;
                f64::from(step % 2)
            }),
        )
        .build()?;

    let presence = Sensor::fused(
        "presence",
        vec![Arc::clone(&camera), Arc::clone(&motion)],
        FusionStrategy::Weighted(vec![0.7, 0.3]),
    )?
    .clock(clock.clone())
    .build()?;

    println!("{camera}");
    println!("{motion}");
    println!("{presence}\n");

    let gate = scheduler.privacy_gate();
    for _ in 0..8 {
        clock.advance(1000);
        let fused = presence.read()?;
        let pir = motion.read()?;
        println!(
            "t={:>2}s  presence={}  hallway={}",
            clock.now() / 1000,
            gate.format_sensor(&presence, fused),
            gate.format_sensor(&motion, pir),
        );
    }

    println!("\nhallway summary: {}", motion.summary_text(8, 2));
    println!("sources warned about: {}", gate.warned_count());
    Ok(())
}
