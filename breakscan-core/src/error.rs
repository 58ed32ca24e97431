//! Run-level error taxonomy.
//!
//! Only `EmptyUniverse` and `BenchmarkMissing` abort a screen. Exhausted
//! batches are downgraded to `FailedTicker` records and incomplete features
//! are filtered out silently, so neither appears here.

use thiserror::Error;

use crate::data::provider::DataError;

#[derive(Debug, Error)]
pub enum ScreenError {
    #[error("no tickers downloaded successfully ({requested} requested, {failed} failed)")]
    EmptyUniverse { requested: usize, failed: usize },

    #[error("benchmark '{benchmark}' has no data; relative strength cannot be computed")]
    BenchmarkMissing { benchmark: String },

    #[error("invalid config: {0}")]
    Config(String),

    #[error(transparent)]
    Data(#[from] DataError),
}

impl ScreenError {
    /// True for the errors that abort a screen run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ScreenError::EmptyUniverse { .. } | ScreenError::BenchmarkMissing { .. }
        )
    }
}
