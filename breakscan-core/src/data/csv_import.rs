//! CSV directory source — offline fallback when Yahoo is unavailable.
//!
//! Reads `<dir>/<TICKER>.csv` with header `date,open,high,low,close,volume`.
//! Empty cells are missing values. A ticker without a file is absent from
//! the batch; a file that cannot be parsed fails the whole attempt.

use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::provider::{BatchData, BatchSource, DataError, DataSource};
use crate::domain::{Bar, Ticker, TickerFrame};

#[derive(Debug, Deserialize)]
struct CsvRow {
    date: NaiveDate,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<f64>,
}

impl From<CsvRow> for Bar {
    fn from(row: CsvRow) -> Self {
        Bar {
            date: row.date,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CsvSource {
    dir: PathBuf,
}

impl CsvSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, ticker: &Ticker) -> PathBuf {
        self.dir.join(format!("{}.csv", ticker.as_str()))
    }

    fn read_file(path: &Path, start: NaiveDate, end: NaiveDate) -> Result<Vec<Bar>, DataError> {
        let import_err = |reason: String| DataError::ImportFailed {
            path: path.display().to_string(),
            reason,
        };
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| import_err(e.to_string()))?;

        let mut bars = Vec::new();
        for row in reader.deserialize::<CsvRow>() {
            let row = row.map_err(|e| import_err(e.to_string()))?;
            if row.date >= start && row.date < end {
                bars.push(Bar::from(row));
            }
        }
        Ok(bars)
    }
}

impl BatchSource for CsvSource {
    fn name(&self) -> &str {
        "csv_import"
    }

    fn download(
        &self,
        tickers: &[Ticker],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BatchData, DataError> {
        if !self.dir.is_dir() {
            return Err(DataError::ImportFailed {
                path: self.dir.display().to_string(),
                reason: "not a directory".into(),
            });
        }

        let mut data = BatchData::new(DataSource::CsvImport);
        for ticker in tickers {
            let path = self.path_for(ticker);
            if !path.is_file() {
                continue;
            }
            let bars = Self::read_file(&path, start, end)?;
            data.insert(TickerFrame::new(ticker.clone(), bars));
        }
        Ok(data)
    }
}
