//! Feature engine — rolling highs, volume ratio, proximity to high and
//! relative-strength momentum.
//!
//! Every series is derived per column over the whole panel, then only the
//! most recent row is kept as the `FeatureRow` snapshot. Columns never see
//! each other except through the benchmark close used for relative strength.

pub mod rolling;

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;

use crate::config::ScreenConfig;
use crate::data::panel::{Column, Panel};
use crate::domain::Ticker;
use crate::error::ScreenError;

pub use rolling::RollingWindow;

/// Full derived series for one ticker, aligned to the panel dates.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedSeries {
    pub rolling_high: Column,
    pub avg_volume: Column,
    pub proximity: Column,
    pub volume_ratio: Column,
    pub relative_strength: Column,
}

/// Per-ticker snapshot at the latest panel date. `None` means undefined.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRow {
    pub ticker: Ticker,
    pub close: Option<f64>,
    pub rolling_high: Option<f64>,
    pub proximity: Option<f64>,
    pub volume_ratio: Option<f64>,
    pub rs_momentum: Option<f64>,
}

impl FeatureRow {
    pub fn is_complete(&self) -> bool {
        self.close.is_some()
            && self.rolling_high.is_some()
            && self.proximity.is_some()
            && self.volume_ratio.is_some()
            && self.rs_momentum.is_some()
    }
}

/// Snapshot of every non-benchmark ticker in the panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureSet {
    pub as_of: Option<NaiveDate>,
    pub benchmark: Ticker,
    pub rows: Vec<FeatureRow>,
}

impl FeatureSet {
    pub fn get(&self, ticker: &Ticker) -> Option<&FeatureRow> {
        self.rows.iter().find(|r| &r.ticker == ticker)
    }
}

#[derive(Debug, Clone)]
pub struct FeatureEngine {
    high_window: RollingWindow,
    volume_window: RollingWindow,
    skip_recent: usize,
    benchmark: Ticker,
}

impl FeatureEngine {
    pub fn new(config: &ScreenConfig) -> Self {
        Self {
            high_window: RollingWindow::with_min_periods(config.lookback_days.max(1), 1),
            volume_window: RollingWindow::new(config.volume_window.max(1)),
            skip_recent: config.skip_recent_days,
            benchmark: Ticker::new(&config.benchmark),
        }
    }

    pub fn benchmark(&self) -> &Ticker {
        &self.benchmark
    }

    /// Derive all series for every ticker and snapshot the latest row.
    ///
    /// Fails only when the benchmark has no close data.
    pub fn compute(&self, panel: &Panel) -> Result<FeatureSet, ScreenError> {
        let bench_close = self.benchmark_close(panel)?;
        let tickers: Vec<&Ticker> = panel
            .tickers()
            .filter(|t| **t != self.benchmark)
            .collect();

        let rows = tickers
            .par_iter()
            .filter_map(|ticker| {
                let series = self.series(panel, ticker, bench_close)?;
                Some(self.snapshot(panel, ticker, &series))
            })
            .collect();

        Ok(FeatureSet {
            as_of: panel.last_date(),
            benchmark: self.benchmark.clone(),
            rows,
        })
    }

    fn benchmark_close<'p>(&self, panel: &'p Panel) -> Result<&'p [Option<f64>], ScreenError> {
        panel
            .close(&self.benchmark)
            .filter(|close| close.iter().any(Option::is_some))
            .ok_or_else(|| ScreenError::BenchmarkMissing {
                benchmark: self.benchmark.to_string(),
            })
    }

    /// Derived series for one ticker. `None` if the ticker is not in the panel.
    pub fn series(
        &self,
        panel: &Panel,
        ticker: &Ticker,
        bench_close: &[Option<f64>],
    ) -> Option<DerivedSeries> {
        let close = panel.close(ticker)?;
        let high = panel.high(ticker)?;
        let volume = panel.volume(ticker)?;

        let rolling_high = self.high_window.max(high);
        let avg_volume = self.volume_window.mean(volume);

        let proximity = zip_map(&rolling_high, close, |h, c| {
            (h > 0.0).then(|| (h - c) / h)
        });
        let volume_ratio = zip_map(volume, &avg_volume, |v, avg| (avg > 0.0).then(|| v / avg));
        let relative_strength = zip_map(close, bench_close, |c, b| (b > 0.0).then(|| c / b));

        Some(DerivedSeries {
            rolling_high,
            avg_volume,
            proximity,
            volume_ratio,
            relative_strength,
        })
    }

    fn snapshot(&self, panel: &Panel, ticker: &Ticker, series: &DerivedSeries) -> FeatureRow {
        let last = panel.len().checked_sub(1);
        let at = |column: &[Option<f64>]| last.and_then(|i| column.get(i).copied().flatten());

        FeatureRow {
            ticker: ticker.clone(),
            close: panel.close(ticker).and_then(at),
            rolling_high: at(series.rolling_high.as_slice()),
            proximity: at(series.proximity.as_slice()),
            volume_ratio: at(series.volume_ratio.as_slice()),
            rs_momentum: self.rs_momentum(&series.relative_strength),
        }
    }

    /// `rs[last - skip] / rs[first] - 1`, measured from the first panel row.
    ///
    /// `skip_recent_days = k` drops exactly `k` rows: the endpoint is the
    /// row `k` before the latest, never `k - 1`.
    pub fn rs_momentum(&self, relative_strength: &[Option<f64>]) -> Option<f64> {
        let end = relative_strength
            .len()
            .checked_sub(1)?
            .checked_sub(self.skip_recent)?;
        let first = relative_strength.first().copied().flatten()?;
        let latest = relative_strength[end]?;
        if first == 0.0 {
            return None;
        }
        let momentum = latest / first - 1.0;
        momentum.is_finite().then_some(momentum)
    }
}

/// Elementwise combine two aligned columns; missing on either side is missing.
fn zip_map<F>(a: &[Option<f64>], b: &[Option<f64>], f: F) -> Column
where
    F: Fn(f64, f64) -> Option<f64>,
{
    a.iter()
        .zip(b)
        .map(|(x, y)| match (x, y) {
            (Some(x), Some(y)) => f(*x, *y).filter(|v| v.is_finite()),
            _ => None,
        })
        .collect()
}
