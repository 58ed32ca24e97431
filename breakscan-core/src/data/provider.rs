//! Batch source trait and structured error types.
//!
//! `BatchSource` abstracts over where bars come from (Yahoo Finance, CSV
//! import, synthetic data) so the fetcher can be driven by a mock in tests.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::domain::{Ticker, TickerFrame};

/// Structured error types for data operations.
///
/// Every variant returned from `BatchSource::download` counts as a failed
/// attempt for the retry machine, except `SymbolNotFound`, which sources
/// use internally to drop a single ticker from an otherwise good batch.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("import failed for {path}: {reason}")]
    ImportFailed { path: String, reason: String },

    #[error("data error: {0}")]
    Other(String),
}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    YahooFinance,
    CsvImport,
    Synthetic,
}

/// Frames returned by one successful batch download.
///
/// Tickers that the source had no data for are simply absent.
#[derive(Debug, Clone)]
pub struct BatchData {
    pub frames: BTreeMap<Ticker, TickerFrame>,
    pub source: DataSource,
}

impl BatchData {
    pub fn new(source: DataSource) -> Self {
        Self {
            frames: BTreeMap::new(),
            source,
        }
    }

    pub fn insert(&mut self, frame: TickerFrame) {
        self.frames.insert(frame.ticker.clone(), frame);
    }

    pub fn is_empty(&self) -> bool {
        self.frames.values().all(|f| f.is_empty())
    }
}

/// A source that downloads daily OHLCV history for a group of tickers.
///
/// One call is one attempt: implementations do not retry internally. Dates
/// are the half-open range `[start, end)`.
pub trait BatchSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    fn download(
        &self,
        tickers: &[Ticker],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BatchData, DataError>;

    /// False while the source refuses requests (e.g. circuit breaker open).
    fn is_available(&self) -> bool {
        true
    }
}
