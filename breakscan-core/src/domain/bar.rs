//! Bar — the fundamental market data unit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Ticker;

/// Daily OHLCV bar for one ticker.
///
/// Every price field is optional: providers return nulls for halted or
/// partially reported sessions, and those surface as missing observations
/// in the panel rather than as errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

impl Bar {
    /// Returns true if no OHLCV field carries a value.
    pub fn is_void(&self) -> bool {
        self.open.is_none()
            && self.high.is_none()
            && self.low.is_none()
            && self.close.is_none()
            && self.volume.is_none()
    }
}

/// Full history for a single ticker, dates strictly increasing.
#[derive(Debug, Clone, PartialEq)]
pub struct TickerFrame {
    pub ticker: Ticker,
    pub bars: Vec<Bar>,
}

impl TickerFrame {
    /// Build a frame, sorting by date and dropping void bars and
    /// duplicate dates (first occurrence wins).
    pub fn new(ticker: Ticker, mut bars: Vec<Bar>) -> Self {
        bars.retain(|b| !b.is_void());
        bars.sort_by_key(|b| b.date);
        bars.dedup_by_key(|b| b.date);
        Self { ticker, bars }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(day: u32, close: f64) -> Bar {
        Bar {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: Some(close),
            high: Some(close + 1.0),
            low: Some(close - 1.0),
            close: Some(close),
            volume: Some(1_000.0),
        }
    }

    #[test]
    fn frame_sorts_and_dedups_dates() {
        let frame = TickerFrame::new(
            Ticker::new("SPY"),
            vec![bar(4, 102.0), bar(2, 100.0), bar(3, 101.0), bar(3, 999.0)],
        );
        let dates: Vec<u32> = frame
            .bars
            .iter()
            .map(|b| chrono::Datelike::day(&b.date))
            .collect();
        assert_eq!(dates, vec![2, 3, 4]);
        // First occurrence of the duplicated date survives
        assert_eq!(frame.bars[1].close, Some(101.0));
    }

    #[test]
    fn frame_drops_void_bars() {
        let void = Bar {
            date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            open: None,
            high: None,
            low: None,
            close: None,
            volume: None,
        };
        assert!(void.is_void());
        let frame = TickerFrame::new(Ticker::new("SPY"), vec![bar(2, 100.0), void]);
        assert_eq!(frame.len(), 1);
        assert_eq!(frame.last_date(), NaiveDate::from_ymd_opt(2024, 1, 2));
    }
}
