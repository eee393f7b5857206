//! Benchmarks for channel detection.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use chanfind::prelude::*;

/// Generate an oscillating, slowly drifting series
fn generate_series(n: usize) -> Vec<Sample> {
  let mut bars = Vec::with_capacity(n);

  for i in 0..n {
    let t = i as f64;
    let drift = 100.0 + 0.02 * t;
    let wave = (t * 0.3).sin() * 2.0;
    let noise = ((i * 7 + 13) % 100) as f64 / 200.0; // Deterministic "random"

    let mid = drift + wave;
    bars.push(Sample::new(i as i64 * 1800, mid + 0.5 + noise, mid - 0.5 - noise));
  }

  bars
}

fn bench_fit_channel(c: &mut Criterion) {
  let bars = generate_series(200);
  let options = DetectOptions::default();

  c.bench_function("fit_channel_200_bars", |b| {
    b.iter(|| {
      let _ = black_box(fit_channel(black_box(&bars), &options));
    })
  });
}

fn bench_detect(c: &mut Criterion) {
  let bars = generate_series(1000);
  let options = DetectOptions::default();

  c.bench_function("detect_1000_bars", |b| {
    b.iter(|| {
      let _ = black_box(detect(black_box(&bars), 104.0, false, &options));
    })
  });
}

fn bench_scaling(c: &mut Criterion) {
  let scanner = ChannelScanner::new(DetectOptions::default()).unwrap();
  let quote = Quote::new(104.0, false).unwrap();

  let mut group = c.benchmark_group("scaling");

  for size in [200, 500, 1000, 2000].iter() {
    let bars = generate_series(*size);

    group.bench_with_input(BenchmarkId::new("scan", size), size, |b, _| {
      b.iter(|| {
        let _ = black_box(scanner.scan(black_box(&bars), &quote));
      })
    });

    group.bench_with_input(BenchmarkId::new("scan_parallel", size), size, |b, _| {
      b.iter(|| {
        let _ = black_box(scanner.scan_parallel(black_box(&bars), &quote));
      })
    });
  }

  group.finish();
}

criterion_group!(benches, bench_fit_channel, bench_detect, bench_scaling);

criterion_main!(benches);
