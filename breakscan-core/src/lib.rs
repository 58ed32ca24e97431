//! breakscan core — the momentum-breakout screening pipeline.
//!
//! Stages, leaves first:
//! - Batch fetcher: batched OHLCV download with a retry state machine
//! - Panel assembler: outer-joined, missing-aware close/high/volume columns
//! - Feature engine: rolling high, rolling volume, proximity, RS momentum
//! - Breakout classifier: threshold rule, ranking, display rounding
//!
//! Only the fetcher performs I/O; every later stage is a pure function of
//! its predecessor's output.

pub mod classify;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod features;

pub use classify::{BreakoutCandidate, BreakoutClassifier};
pub use config::ScreenConfig;
pub use error::ScreenError;
pub use features::{FeatureEngine, FeatureRow, FeatureSet};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: pipeline types can cross thread boundaries.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::TickerFrame>();
        require_sync::<domain::TickerFrame>();
        require_send::<data::Panel>();
        require_sync::<data::Panel>();
        require_send::<data::FetchOutcome>();
        require_sync::<data::FetchOutcome>();
        require_send::<FeatureSet>();
        require_sync::<FeatureSet>();
        require_send::<BreakoutCandidate>();
        require_sync::<BreakoutCandidate>();
        require_send::<ScreenConfig>();
        require_sync::<ScreenConfig>();
        require_send::<ScreenError>();
        require_sync::<ScreenError>();
        require_send::<data::YahooSource>();
        require_sync::<data::YahooSource>();
    }

    /// Sources are usable as trait objects.
    #[test]
    fn batch_source_is_object_safe() {
        fn _takes(_: &dyn data::BatchSource) {}
        _takes(&data::SyntheticSource::new(0));
        _takes(&data::CsvSource::new("."));
    }
}
