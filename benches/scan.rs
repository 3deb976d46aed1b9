//! Benchmarks for structure detection and watchlist scans.

use chrono::{DateTime, Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use scalpscan::prelude::*;

fn start() -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2024, 1, 9, 14, 30, 0).unwrap()
}

/// Generate realistic bars for one symbol
fn generate_bars(n: usize, seed: usize) -> Vec<Bar> {
  let mut bars = Vec::with_capacity(n);
  let mut price = 100.0;

  for i in 0..n {
    let change = (((i + seed) * 7 + 13) % 100) as f64 / 500.0 - 0.1; // Deterministic "random"
    let volatility = 0.2 + (((i + seed) * 3) % 10) as f64 / 50.0;

    let o = price;
    let c = price + change;
    let h = o.max(c) + volatility * 0.5;
    let l = o.min(c) - volatility * 0.5;

    bars.push(Bar::new(start() + Duration::minutes(i as i64), o, h, l, c, 1_000.0));
    price = c;
  }

  bars
}

fn watchlist(symbols: usize, bars: usize) -> Vec<BarSeries> {
  (0..symbols)
    .map(|s| BarSeries::new(format!("SYM{s}"), generate_bars(bars, s * 17)).unwrap())
    .collect()
}

fn bench_detectors(c: &mut Criterion) {
  let bars = generate_bars(390, 0);
  let config = DetectionConfig::default();

  let mut group = c.benchmark_group("detectors");
  for detector in BuiltinDetector::from_config(&config) {
    group.bench_function(detector.kind().as_str(), |b| {
      b.iter(|| {
        let _ = black_box(detector.detect_both(black_box(&bars)));
      })
    });
  }
  group.finish();
}

fn bench_trend_context(c: &mut Criterion) {
  let bars = generate_bars(390, 0);

  c.bench_function("trend_context_390_bars", |b| {
    b.iter(|| {
      let _ = black_box(TrendContext::compute(black_box(&bars), 0.0005));
    })
  });
}

fn bench_compose_symbol(c: &mut Criterion) {
  let series = watchlist(1, 390).remove(0);
  let engine = EngineBuilder::new().build().unwrap();

  c.bench_function("compose_symbol_390_bars", |b| {
    b.iter(|| {
      let _ = black_box(engine.compose_symbol(black_box(&series)));
    })
  });
}

fn bench_scan_scaling(c: &mut Criterion) {
  let engine = EngineBuilder::new().build().unwrap();
  let now = start() + Duration::minutes(30);

  let mut group = c.benchmark_group("scan_watchlist");

  for size in [10, 50, 200].iter() {
    let list = watchlist(*size, 390);

    group.bench_with_input(BenchmarkId::new("symbols", size), size, |b, _| {
      b.iter(|| {
        let mut book = CooldownBook::new();
        let _ = black_box(engine.scan(black_box(&list), &mut book, now));
      })
    });
  }

  group.finish();
}

criterion_group!(
  benches,
  bench_detectors,
  bench_trend_context,
  bench_compose_symbol,
  bench_scan_scaling,
);

criterion_main!(benches);
