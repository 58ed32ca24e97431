//! Batch fetcher — partitions the universe into batches and downloads each
//! one through the retry machine.
//!
//! Batches run strictly one after another with a fixed pause between them
//! to stay under upstream rate limits. A batch that exhausts its attempts
//! fails as a whole; a batch that succeeds but lacks some tickers fails
//! only those tickers.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{info, warn};

use super::provider::{BatchData, BatchSource};
use super::retry::{RetryMachine, RetryPolicy, RetryState};
use crate::config::ScreenConfig;
use crate::domain::{Ticker, TickerFrame};

/// Why a ticker has no frame in the fetch outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// Every attempt for the ticker's batch failed.
    BatchExhausted { attempts: u32, last_error: String },
    /// The batch download succeeded but returned nothing at all.
    EmptyBatch,
    /// The batch succeeded but this ticker was absent from the result.
    MissingFromBatch,
    /// The source refused requests before the batch was attempted.
    SourceUnavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedTicker {
    pub ticker: Ticker,
    pub reason: FailureReason,
}

/// Batching and retry parameters for `fetch_in_batches`.
#[derive(Debug, Clone, Copy)]
pub struct FetchConfig {
    pub batch_size: usize,
    pub retry: RetryPolicy,
    pub batch_pause: Duration,
}

impl FetchConfig {
    pub fn from_screen(config: &ScreenConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            retry: RetryPolicy::new(config.retries, config.retry_pause()),
            batch_pause: config.batch_pause(),
        }
    }
}

/// Accumulated result of all batches.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub frames: BTreeMap<Ticker, TickerFrame>,
    pub failed: Vec<FailedTicker>,
    pub batches: usize,
}

impl FetchOutcome {
    pub fn succeeded(&self) -> usize {
        self.frames.len()
    }
}

/// Download `tickers` in contiguous batches of at most `batch_size`.
///
/// Never fails: every requested ticker ends up either in `frames` or in
/// `failed`. Deciding whether an empty result is fatal is the caller's job.
pub fn fetch_in_batches(
    source: &dyn BatchSource,
    tickers: &[Ticker],
    start: NaiveDate,
    end: NaiveDate,
    config: &FetchConfig,
) -> FetchOutcome {
    let mut outcome = FetchOutcome::default();
    let batch_count = tickers.len().div_ceil(config.batch_size.max(1));

    for (index, batch) in tickers.chunks(config.batch_size.max(1)).enumerate() {
        outcome.batches += 1;
        let first = batch.first().map(Ticker::as_str).unwrap_or_default();
        let last = batch.last().map(Ticker::as_str).unwrap_or_default();
        info!(
            batch = index + 1,
            of = batch_count,
            size = batch.len(),
            "fetching {first} to {last} from {}",
            source.name()
        );

        // Source is refusing requests (circuit breaker open).
        if !source.is_available() {
            warn!(batch = index + 1, "source unavailable, skipping batch");
            fail_all(&mut outcome, batch, FailureReason::SourceUnavailable);
            // No request was made, so there is nothing to pace.
            continue;
        }

        let state = RetryMachine::new(config.retry).run(|_| source.download(batch, start, end));
        match state {
            RetryState::Succeeded { value, attempts } => {
                merge_batch(&mut outcome, batch, value);
                info!(
                    batch = index + 1,
                    attempts,
                    downloaded = outcome.frames.len(),
                    "batch complete"
                );
            }
            RetryState::Exhausted {
                attempts,
                last_error,
            } => {
                warn!(batch = index + 1, attempts, error = %last_error, "batch exhausted retries");
                let reason = FailureReason::BatchExhausted {
                    attempts,
                    last_error: last_error.to_string(),
                };
                fail_all(&mut outcome, batch, reason);
            }
            // `run` only returns terminal states
            _ => unreachable!("retry machine returned a non-terminal state"),
        }

        if !config.batch_pause.is_zero() {
            std::thread::sleep(config.batch_pause);
        }
    }

    outcome
}

fn merge_batch(outcome: &mut FetchOutcome, batch: &[Ticker], mut data: BatchData) {
    if data.is_empty() {
        warn!(size = batch.len(), "batch returned no data");
        fail_all(outcome, batch, FailureReason::EmptyBatch);
        return;
    }

    for ticker in batch {
        match data.frames.remove(ticker) {
            Some(frame) if !frame.is_empty() => {
                outcome.frames.insert(ticker.clone(), frame);
            }
            _ => outcome.failed.push(FailedTicker {
                ticker: ticker.clone(),
                reason: FailureReason::MissingFromBatch,
            }),
        }
    }
}

fn fail_all(outcome: &mut FetchOutcome, batch: &[Ticker], reason: FailureReason) {
    outcome
        .failed
        .extend(batch.iter().map(|ticker| FailedTicker {
            ticker: ticker.clone(),
            reason: reason.clone(),
        }));
}
