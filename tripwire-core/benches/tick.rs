//! Benchmark suite for scheduler ticks and condition evaluation

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tripwire_core::sensor::FnSource;
use tripwire_core::{sequence, within, Condition, ManualTime, Scheduler};

fn ramp() -> FnSource<impl FnMut() -> f64 + Send> {
    let mut step = 0u64;
    FnSource::new(move || {
        step += 1;
        (step % 100) as f64
    })
}

fn scheduler_with(rules: usize) -> (Scheduler, Arc<ManualTime>) {
    let clock = Arc::new(ManualTime::new(0));
    let mut scheduler = Scheduler::default().with_clock(clock.clone());

    let sensors: Vec<_> = (0..8)
        .map(|i| {
            let sensor = scheduler
                .sensor_builder(format!("s{i}"), ramp())
                .build()
                .unwrap();
            scheduler.add_sensor(Arc::clone(&sensor)).unwrap();
            sensor
        })
        .collect();

    for r in 0..rules {
        let sensor = &sensors[r % sensors.len()];
        let threshold = (r % 90) as f64;
        let hot = Condition::sensor(sensor, move |v| v > threshold);
        let condition = within(0.5, hot).unwrap();
        scheduler
            .register(format!("rule{r}"), condition, || {})
            .unwrap();
    }

    (scheduler, clock)
}

fn benchmark_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");
    for rules in [10usize, 100, 1000] {
        let (mut scheduler, clock) = scheduler_with(rules);
        group.bench_with_input(BenchmarkId::from_parameter(rules), &rules, |b, _| {
            b.iter(|| {
                clock.advance(100);
                black_box(scheduler.tick().unwrap())
            });
        });
    }
    group.finish();
}

fn benchmark_condition_tree(c: &mut Criterion) {
    let counter = Arc::new(AtomicU64::new(0));
    let leaf = |m: u64| {
        let counter = Arc::clone(&counter);
        Condition::new(move || counter.load(Ordering::Relaxed) % m == 0)
    };

    let tree = (leaf(2) & !leaf(3)) | (leaf(5) & leaf(7));
    let seq = sequence(vec![leaf(2), leaf(3), leaf(5)], 10.0).unwrap();

    let mut now = 0u64;
    c.bench_function("condition_tree", |b| {
        b.iter(|| {
            now += 10;
            counter.fetch_add(1, Ordering::Relaxed);
            black_box(tree.evaluate_at(now))
        });
    });

    c.bench_function("sequence_three_steps", |b| {
        b.iter(|| {
            now += 10;
            counter.fetch_add(1, Ordering::Relaxed);
            black_box(seq.evaluate_at(now))
        });
    });
}

criterion_group!(benches, benchmark_tick, benchmark_condition_tree);
criterion_main!(benches);
