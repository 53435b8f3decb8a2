use bodycomp::calibration::{CalibrationEngine, CalibrationTables};
use bodycomp::models::RawMeasurement;
use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

/// Benchmarks for batch calibration over multi-year histories

fn create_history(days: usize) -> Vec<RawMeasurement> {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    (0..days)
        .map(|i| RawMeasurement {
            date: start + chrono::Duration::days(i as i64),
            weight: Some(150.0 + (i % 40) as f64 * 0.9),
            fat_percent: if i % 10 == 0 {
                None
            } else {
                Some(12.0 + (i % 12) as f64)
            },
        })
        .collect()
}

fn bench_calibrate_batch(c: &mut Criterion) {
    let engine = CalibrationEngine::new(CalibrationTables::default()).unwrap();
    let mut group = c.benchmark_group("Calibration");

    for &days in &[30, 365, 3650, 36500] {
        let history = create_history(days);
        group.throughput(Throughput::Elements(days as u64));

        group.bench_with_input(
            BenchmarkId::new("calibrate_batch", days),
            &history,
            |b, history| b.iter(|| engine.calibrate_batch(black_box(history))),
        );

        group.bench_with_input(
            BenchmarkId::new("calibrate_batch_parallel", days),
            &history,
            |b, history| b.iter(|| engine.calibrate_batch_parallel(black_box(history))),
        );
    }

    group.finish();
}

fn bench_fat_bias_lookup(c: &mut Criterion) {
    let engine = CalibrationEngine::new(CalibrationTables::default()).unwrap();

    c.bench_function("fat_bias_for_weight", |b| {
        b.iter(|| {
            for w in [150.0, 167.8, 170.0, 180.0, 195.0] {
                black_box(engine.fat_bias_for_weight(black_box(w)));
            }
        })
    });
}

criterion_group!(benches, bench_calibrate_batch, bench_fat_bias_lookup);
criterion_main!(benches);
