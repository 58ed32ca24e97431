//! Seeded synthetic bars for offline runs and tests.
//!
//! Each ticker gets an independent random walk, deterministic in
//! `(seed, ticker)`. Weekends are skipped; holidays are not modeled.

use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::provider::{BatchData, BatchSource, DataError, DataSource};
use crate::domain::{Bar, Ticker, TickerFrame};

#[derive(Debug, Clone)]
pub struct SyntheticSource {
    seed: u64,
    /// Tickers this source pretends not to know.
    unknown: Vec<Ticker>,
}

impl SyntheticSource {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            unknown: Vec::new(),
        }
    }

    /// Mark tickers as unknown so they come back missing from every batch.
    pub fn with_unknown(mut self, tickers: impl IntoIterator<Item = Ticker>) -> Self {
        self.unknown.extend(tickers);
        self
    }

    fn rng_for(&self, ticker: &Ticker) -> StdRng {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.seed.to_le_bytes());
        hasher.update(ticker.as_str().as_bytes());
        StdRng::from_seed(*hasher.finalize().as_bytes())
    }

    /// Random walk from 100.0 over weekdays in `[start, end)`.
    pub fn generate(&self, ticker: &Ticker, start: NaiveDate, end: NaiveDate) -> Vec<Bar> {
        let mut rng = self.rng_for(ticker);
        let drift: f64 = rng.gen_range(-0.002..0.002);
        let base_volume: f64 = rng.gen_range(500_000.0..5_000_000.0);

        let mut bars = Vec::new();
        let mut price = 100.0_f64;
        let mut current = start;
        while current < end {
            if matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
                current += chrono::Duration::days(1);
                continue;
            }

            let daily_return: f64 = drift + rng.gen_range(-0.02..0.02);
            let open = price;
            let close = price * (1.0 + daily_return);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
            let volume = (base_volume * rng.gen_range(0.5..1.8)).round();

            bars.push(Bar {
                date: current,
                open: Some(open),
                high: Some(high),
                low: Some(low),
                close: Some(close),
                volume: Some(volume),
            });

            price = close;
            current += chrono::Duration::days(1);
        }
        bars
    }
}

impl BatchSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn download(
        &self,
        tickers: &[Ticker],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BatchData, DataError> {
        let mut data = BatchData::new(DataSource::Synthetic);
        for ticker in tickers.iter().filter(|t| !self.unknown.contains(t)) {
            let bars = self.generate(ticker, start, end);
            data.insert(TickerFrame::new(ticker.clone(), bars));
        }
        Ok(data)
    }
}
