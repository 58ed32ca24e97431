//! Data acquisition and alignment: sources, batch fetch with retry, panel.

pub mod circuit_breaker;
pub mod csv_import;
pub mod fetch;
pub mod panel;
pub mod provider;
pub mod retry;
pub mod synthetic;
pub mod universe;
pub mod yahoo;

pub use circuit_breaker::CircuitBreaker;
pub use csv_import::CsvSource;
pub use fetch::{fetch_in_batches, FailedTicker, FailureReason, FetchConfig, FetchOutcome};
pub use panel::{Column, Panel};
pub use provider::{BatchData, BatchSource, DataError, DataSource};
pub use retry::{RetryMachine, RetryPolicy, RetryState};
pub use synthetic::SyntheticSource;
pub use universe::Universe;
pub use yahoo::YahooSource;
