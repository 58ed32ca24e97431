//! breakscan runner — end-to-end screen orchestration on top of `breakscan-core`.
//!
//! This crate provides:
//! - The screen pipeline (fetch, EmptyUniverse check, panel, features, classify)
//! - Run summaries with config and dataset fingerprints
//! - The `{"data": [...]}` JSON report and a CSV export
//! - Logging setup for binaries

pub mod logging;
pub mod pipeline;
pub mod report;

pub use logging::init_logging;
pub use pipeline::{run_screen, RunSummary, ScreenRun};
pub use report::{
    candidates_csv, read_report, screen_to_file, write_report, ScreenOutcome, ScreenReport,
};
