//! Criterion benchmarks for the screening hot paths.
//!
//! Benchmarks:
//! 1. Panel assembly (outer join of per-ticker frames)
//! 2. Rolling windows (max with min_periods = 1, full-window mean)
//! 3. Feature engine over a whole panel
//! 4. Classification of a feature snapshot

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::collections::BTreeMap;

use breakscan_core::data::Panel;
use breakscan_core::domain::{Bar, Ticker, TickerFrame};
use breakscan_core::features::RollingWindow;
use breakscan_core::{BreakoutClassifier, FeatureEngine, ScreenConfig};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_frame(symbol: &str, n: usize, phase: f64) -> TickerFrame {
    let base_date = chrono::NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
    let bars = (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1 + phase).sin() * 10.0;
            Bar {
                date: base_date + chrono::Duration::days(i as i64),
                open: Some(close - 0.3),
                high: Some(close + 1.5),
                low: Some(close - 1.5),
                close: Some(close),
                volume: Some(1_000_000.0 + (i % 500) as f64 * 1_000.0),
            }
        })
        .collect();
    TickerFrame::new(Ticker::new(symbol), bars)
}

fn make_frames(tickers: usize, bars: usize) -> BTreeMap<Ticker, TickerFrame> {
    let mut frames: BTreeMap<Ticker, TickerFrame> = (0..tickers)
        .map(|i| make_frame(&format!("T{i:03}"), bars, i as f64))
        .map(|f| (f.ticker.clone(), f))
        .collect();
    let spy = make_frame("SPY", bars, 0.5);
    frames.insert(spy.ticker.clone(), spy);
    frames
}

fn make_column(n: usize) -> Vec<Option<f64>> {
    (0..n)
        .map(|i| (i % 17 != 0).then(|| 100.0 + (i as f64 * 0.1).sin() * 10.0))
        .collect()
}

// ── Benchmarks ───────────────────────────────────────────────────────

fn bench_panel_assembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("panel_assemble");
    for tickers in [10, 100, 500] {
        let frames = make_frames(tickers, 252);
        group.bench_with_input(BenchmarkId::from_parameter(tickers), &frames, |b, frames| {
            b.iter(|| Panel::assemble(black_box(frames)))
        });
    }
    group.finish();
}

fn bench_rolling(c: &mut Criterion) {
    let column = make_column(2_520);
    let high = RollingWindow::with_min_periods(365, 1);
    let volume = RollingWindow::new(50);

    c.bench_function("rolling_max_365", |b| b.iter(|| high.max(black_box(&column))));
    c.bench_function("rolling_mean_50", |b| b.iter(|| volume.mean(black_box(&column))));
}

fn bench_feature_engine(c: &mut Criterion) {
    let config = ScreenConfig::default();
    let engine = FeatureEngine::new(&config);
    let mut group = c.benchmark_group("feature_engine");
    for tickers in [10, 100, 500] {
        let panel = Panel::assemble(&make_frames(tickers, 252));
        group.bench_with_input(BenchmarkId::from_parameter(tickers), &panel, |b, panel| {
            b.iter(|| engine.compute(black_box(panel)))
        });
    }
    group.finish();
}

fn bench_classify(c: &mut Criterion) {
    let config = ScreenConfig {
        soft_breakout_pct: 1.0,
        volume_threshold: 0.0,
        ..ScreenConfig::default()
    };
    let panel = Panel::assemble(&make_frames(500, 252));
    let features = FeatureEngine::new(&config).compute(&panel).unwrap();
    let classifier = BreakoutClassifier::new(&config);

    c.bench_function("classify_500", |b| b.iter(|| classifier.classify(black_box(&features))));
}

criterion_group!(
    benches,
    bench_panel_assembly,
    bench_rolling,
    bench_feature_engine,
    bench_classify
);
criterion_main!(benches);
