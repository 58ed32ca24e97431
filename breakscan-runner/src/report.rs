//! Screen output — the `{"data": [...]}` JSON report and a CSV export.
//!
//! `screen_to_file` always leaves a well-formed report behind: when the
//! screen aborts, an empty `{"data": []}` is written in its place.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use breakscan_core::data::{BatchSource, Universe};
use breakscan_core::{BreakoutCandidate, ScreenConfig, ScreenError};

use crate::pipeline::{run_screen, ScreenRun};

/// Top-level JSON document consumed downstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenReport {
    pub data: Vec<BreakoutCandidate>,
}

impl ScreenReport {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_candidates(candidates: &[BreakoutCandidate]) -> Self {
        Self {
            data: candidates.to_vec(),
        }
    }
}

/// Write `report` as pretty JSON, creating parent directories as needed.
pub fn write_report(path: &Path, report: &ScreenReport) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(report).context("failed to serialize report")?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

pub fn read_report(path: &Path) -> Result<ScreenReport> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("malformed report {}", path.display()))
}

/// Candidates as CSV with the report's column names.
pub fn candidates_csv(candidates: &[BreakoutCandidate]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for c in candidates {
        wtr.serialize(c)?;
    }
    // An empty list still gets a header row.
    if candidates.is_empty() {
        wtr.write_record([
            "ticker",
            "price",
            "high_52w",
            "dist_to_high_pct",
            "volume_ratio",
            "rs_score",
        ])?;
    }
    let bytes = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

/// How a `screen_to_file` call ended. Both arms have written a report.
#[derive(Debug)]
pub enum ScreenOutcome {
    Completed(ScreenRun),
    Aborted(ScreenError),
}

/// Run the screen and write its report to `output`.
///
/// A screen error is logged and replaced by an empty report; only I/O
/// failures while writing surface as `Err`.
pub fn screen_to_file(
    source: &dyn BatchSource,
    universe: &Universe,
    config: &ScreenConfig,
    start: NaiveDate,
    end: NaiveDate,
    output: &Path,
) -> Result<ScreenOutcome> {
    match run_screen(source, universe, config, start, end) {
        Ok(run) => {
            write_report(output, &ScreenReport::from_candidates(&run.candidates))?;
            info!(
                path = %output.display(),
                candidates = run.candidates.len(),
                "report written"
            );
            Ok(ScreenOutcome::Completed(run))
        }
        Err(e) => {
            error!(error = %e, "screen aborted; writing empty report");
            write_report(output, &ScreenReport::empty())?;
            Ok(ScreenOutcome::Aborted(e))
        }
    }
}
