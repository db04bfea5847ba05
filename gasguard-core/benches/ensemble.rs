//! Benchmarks for a full ensemble evaluation

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gasguard_core::{EnsembleDetector, MemoryStore, Reading, ThresholdSet};

fn history(size: usize) -> Arc<MemoryStore> {
    let start = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
    let readings = (0..size).map(|i| {
        let value = 150.0 + (i as f64 * 0.2).sin() * 40.0;
        Reading::new(start + Duration::seconds(5 * i as i64), "bench", "mq5_01", value)
    });
    Arc::new(MemoryStore::with_readings(readings).unwrap())
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");

    for size in [0usize, 100, 10_000] {
        let engine = EnsembleDetector::new(ThresholdSet::default(), history(size));
        group.bench_with_input(BenchmarkId::new("history", size), &engine, |b, engine| {
            b.iter(|| engine.evaluate(black_box(420.0), black_box("mq5_01")))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_evaluate);
criterion_main!(benches);
