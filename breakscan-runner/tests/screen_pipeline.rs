//! End-to-end screen runs through the runner, including report output.

use chrono::NaiveDate;
use std::sync::atomic::{AtomicU32, Ordering};

use breakscan_core::data::{
    BatchData, BatchSource, DataError, FailureReason, SyntheticSource, Universe,
};
use breakscan_core::domain::Ticker;
use breakscan_core::{ScreenConfig, ScreenError};
use breakscan_runner::{read_report, run_screen, screen_to_file, ScreenOutcome, ScreenReport};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn fast_config() -> ScreenConfig {
    ScreenConfig {
        sleep_between_batches: 0.0,
        retry_delay: 0.0,
        batch_size: 3,
        ..ScreenConfig::default()
    }
}

/// Loose thresholds so the synthetic universe yields candidates.
fn loose_config() -> ScreenConfig {
    ScreenConfig {
        soft_breakout_pct: 1.0,
        volume_threshold: 0.0,
        ..fast_config()
    }
}

fn universe() -> Universe {
    Universe::from_symbols(["AAPL", "MSFT", "NVDA", "BRK.B", "XOM"])
}

/// Always fails with a transient error.
struct DeadSource {
    calls: AtomicU32,
}

impl BatchSource for DeadSource {
    fn name(&self) -> &str {
        "dead"
    }

    fn download(&self, _: &[Ticker], _: NaiveDate, _: NaiveDate) -> Result<BatchData, DataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(DataError::NetworkUnreachable("connection refused".into()))
    }
}

/// Fails every other call, delegating the rest to a synthetic source.
struct FlakySource {
    inner: SyntheticSource,
    calls: AtomicU32,
}

impl BatchSource for FlakySource {
    fn name(&self) -> &str {
        "flaky"
    }

    fn download(
        &self,
        tickers: &[Ticker],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BatchData, DataError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) % 2 == 0 {
            return Err(DataError::RateLimited {
                retry_after_secs: 0,
            });
        }
        self.inner.download(tickers, start, end)
    }
}

#[test]
fn synthetic_screen_is_deterministic() {
    let source = SyntheticSource::new(42);
    let run = || {
        run_screen(&source, &universe(), &loose_config(), date(2023, 1, 1), date(2024, 1, 1))
            .unwrap()
    };
    let (a, b) = (run(), run());
    assert_eq!(a.candidates, b.candidates);
    assert_eq!(a.summary.dataset_hash, b.summary.dataset_hash);
    assert_eq!(a.summary.config_hash, b.summary.config_hash);
}

#[test]
fn benchmark_is_fetched_but_never_reported() {
    let source = SyntheticSource::new(42);
    let run = run_screen(&source, &universe(), &loose_config(), date(2023, 1, 1), date(2024, 1, 1))
        .unwrap();
    assert_eq!(run.summary.requested, 6);
    assert_eq!(run.summary.evaluated, 5);
    assert!(!run.candidates.is_empty());
    assert!(run.candidates.iter().all(|c| c.ticker.as_str() != "SPY"));
    // Normalized before use
    assert!(run.candidates.iter().all(|c| c.ticker.as_str() != "BRK.B"));
}

#[test]
fn candidates_sorted_and_rounded() {
    let source = SyntheticSource::new(9);
    let run = run_screen(&source, &universe(), &loose_config(), date(2023, 1, 1), date(2024, 1, 1))
        .unwrap();
    for pair in run.candidates.windows(2) {
        assert!(pair[0].dist_to_high_pct <= pair[1].dist_to_high_pct);
    }
    for c in &run.candidates {
        for v in [c.price, c.high_52w, c.dist_to_high_pct, c.volume_ratio, c.rs_score] {
            assert!(((v * 100.0).round() - v * 100.0).abs() < 1e-6);
        }
    }
}

#[test]
fn flaky_batches_recover_through_retry() {
    let source = FlakySource {
        inner: SyntheticSource::new(42),
        calls: AtomicU32::new(0),
    };
    let run = run_screen(&source, &universe(), &fast_config(), date(2023, 1, 1), date(2024, 1, 1))
        .unwrap();
    assert!(run.failed.is_empty());
    assert_eq!(run.summary.succeeded, 6);
    // Two batches, each failing once before succeeding
    assert_eq!(source.calls.load(Ordering::SeqCst), 4);
}

#[test]
fn exhausted_batch_downgrades_to_failed_tickers() {
    let config = ScreenConfig {
        batch_size: 100,
        ..fast_config()
    };
    let source = DeadSource {
        calls: AtomicU32::new(0),
    };
    let err = run_screen(&source, &universe(), &config, date(2023, 1, 1), date(2024, 1, 1))
        .unwrap_err();
    assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    match err {
        ScreenError::EmptyUniverse { requested, failed } => {
            assert_eq!(requested, 6);
            assert_eq!(failed, 6);
        }
        other => panic!("expected EmptyUniverse, got {other:?}"),
    }
}

#[test]
fn unknown_tickers_do_not_abort_the_run() {
    let source = SyntheticSource::new(42).with_unknown([Ticker::new("MSFT")]);
    let run = run_screen(&source, &universe(), &fast_config(), date(2023, 1, 1), date(2024, 1, 1))
        .unwrap();
    assert_eq!(run.failed.len(), 1);
    assert_eq!(run.failed[0].ticker.as_str(), "MSFT");
    assert_eq!(run.failed[0].reason, FailureReason::MissingFromBatch);
}

#[test]
fn all_failed_universe_writes_empty_report() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("data/screener_momentum.json");
    let source = DeadSource {
        calls: AtomicU32::new(0),
    };

    let outcome = screen_to_file(
        &source,
        &universe(),
        &fast_config(),
        date(2023, 1, 1),
        date(2024, 1, 1),
        &output,
    )
    .unwrap();

    match outcome {
        ScreenOutcome::Aborted(e) => assert!(e.is_fatal()),
        ScreenOutcome::Completed(_) => panic!("dead source cannot complete"),
    }
    assert_eq!(read_report(&output).unwrap(), ScreenReport::empty());
    let raw = std::fs::read_to_string(&output).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value, serde_json::json!({ "data": [] }));
}

#[test]
fn missing_benchmark_writes_empty_report() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("screen.json");
    let source = SyntheticSource::new(42).with_unknown([Ticker::new("SPY")]);

    let outcome = screen_to_file(
        &source,
        &universe(),
        &fast_config(),
        date(2023, 1, 1),
        date(2024, 1, 1),
        &output,
    )
    .unwrap();

    assert!(matches!(
        outcome,
        ScreenOutcome::Aborted(ScreenError::BenchmarkMissing { .. })
    ));
    assert!(read_report(&output).unwrap().data.is_empty());
}

#[test]
fn completed_screen_report_matches_candidates() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("screen.json");
    let source = SyntheticSource::new(42);

    let outcome = screen_to_file(
        &source,
        &universe(),
        &loose_config(),
        date(2023, 1, 1),
        date(2024, 1, 1),
        &output,
    )
    .unwrap();

    let ScreenOutcome::Completed(run) = outcome else {
        panic!("synthetic screen should complete");
    };
    assert_eq!(read_report(&output).unwrap().data, run.candidates);
}
