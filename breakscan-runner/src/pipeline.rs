//! Screen pipeline — fetch, assemble, derive features, classify.
//!
//! The universe is extended with the benchmark before fetching. A run is
//! aborted only when nothing could be downloaded or the benchmark has no
//! data; every other failure is recorded in the result and the run goes on.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use breakscan_core::data::{
    fetch_in_batches, BatchSource, FailedTicker, FetchConfig, Panel, Universe,
};
use breakscan_core::domain::{DatasetHash, Ticker};
use breakscan_core::{
    BreakoutCandidate, BreakoutClassifier, FeatureEngine, ScreenConfig, ScreenError,
};

/// Counts and fingerprints describing one screen run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub source: String,
    pub requested: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub batches: usize,
    pub evaluated: usize,
    pub candidates: usize,
    pub panel_rows: usize,
    pub panel_start: Option<NaiveDate>,
    pub panel_end: Option<NaiveDate>,
    pub config_hash: String,
    pub dataset_hash: DatasetHash,
}

/// Result of a completed screen.
#[derive(Debug, Clone)]
pub struct ScreenRun {
    /// Qualifying tickers, closest to their high first.
    pub candidates: Vec<BreakoutCandidate>,
    pub failed: Vec<FailedTicker>,
    pub summary: RunSummary,
}

/// Run the full screen over `universe` for bars in `[start, end)`.
pub fn run_screen(
    source: &dyn BatchSource,
    universe: &Universe,
    config: &ScreenConfig,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<ScreenRun, ScreenError> {
    config.validate()?;
    if start >= end {
        return Err(ScreenError::Config(format!(
            "start {start} must be before end {end}"
        )));
    }
    if universe.is_empty() {
        return Err(ScreenError::EmptyUniverse {
            requested: 0,
            failed: 0,
        });
    }

    let benchmark = Ticker::new(&config.benchmark);
    let universe = universe.clone().with_benchmark(&benchmark);
    let config_hash = config.config_hash();
    let short_hash = &config_hash[..12];
    info!(
        source = source.name(),
        tickers = universe.len(),
        %start,
        %end,
        config_hash = short_hash,
        "starting screen"
    );

    let outcome = fetch_in_batches(
        source,
        universe.tickers(),
        start,
        end,
        &FetchConfig::from_screen(config),
    );
    if outcome.succeeded() == 0 {
        return Err(ScreenError::EmptyUniverse {
            requested: universe.len(),
            failed: outcome.failed.len(),
        });
    }
    if !outcome.failed.is_empty() {
        warn!(
            failed = outcome.failed.len(),
            succeeded = outcome.succeeded(),
            "some tickers could not be downloaded"
        );
    }

    let panel = Panel::assemble(&outcome.frames);
    let features = FeatureEngine::new(config).compute(&panel)?;
    let candidates = BreakoutClassifier::new(config).classify(&features);

    let summary = RunSummary {
        source: source.name().to_string(),
        requested: universe.len(),
        succeeded: outcome.succeeded(),
        failed: outcome.failed.len(),
        batches: outcome.batches,
        evaluated: features.rows.len(),
        candidates: candidates.len(),
        panel_rows: panel.len(),
        panel_start: panel.first_date(),
        panel_end: panel.last_date(),
        config_hash,
        dataset_hash: panel.dataset_hash(),
    };
    info!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        evaluated = summary.evaluated,
        candidates = summary.candidates,
        "screen complete"
    );

    Ok(ScreenRun {
        candidates,
        failed: outcome.failed,
        summary,
    })
}
