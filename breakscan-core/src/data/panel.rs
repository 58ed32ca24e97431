//! Panel assembly — align per-ticker frames onto one date axis.
//!
//! The date axis is the union of every contributing ticker's dates. A
//! ticker with no bar on a panel date gets `None` in that row: there is no
//! forward or backward fill here, gaps are resolved (or not) by the rolling
//! windows downstream.

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::domain::{DatasetHash, Ticker, TickerFrame};

/// One ticker's values aligned to the panel dates.
pub type Column = Vec<Option<f64>>;

/// Aligned close/high/volume columns for many tickers.
///
/// Invariant: every column has exactly `dates.len()` entries and `dates`
/// is strictly ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    dates: Vec<NaiveDate>,
    close: BTreeMap<Ticker, Column>,
    high: BTreeMap<Ticker, Column>,
    volume: BTreeMap<Ticker, Column>,
}

impl Panel {
    /// Outer-join the frames on date.
    ///
    /// Non-finite values are stored as missing.
    pub fn assemble(frames: &BTreeMap<Ticker, TickerFrame>) -> Self {
        let dates: Vec<NaiveDate> = frames
            .values()
            .flat_map(|f| f.bars.iter().map(|b| b.date))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let row_of: HashMap<NaiveDate, usize> =
            dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();

        let mut close = BTreeMap::new();
        let mut high = BTreeMap::new();
        let mut volume = BTreeMap::new();

        for (ticker, frame) in frames {
            let mut c: Column = vec![None; dates.len()];
            let mut h: Column = vec![None; dates.len()];
            let mut v: Column = vec![None; dates.len()];
            for bar in &frame.bars {
                let row = row_of[&bar.date];
                c[row] = finite(bar.close);
                h[row] = finite(bar.high);
                v[row] = finite(bar.volume);
            }
            close.insert(ticker.clone(), c);
            high.insert(ticker.clone(), h);
            volume.insert(ticker.clone(), v);
        }

        Self {
            dates,
            close,
            high,
            volume,
        }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Number of rows (dates).
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Tickers in column order.
    pub fn tickers(&self) -> impl Iterator<Item = &Ticker> {
        self.close.keys()
    }

    pub fn ticker_count(&self) -> usize {
        self.close.len()
    }

    pub fn contains(&self, ticker: &Ticker) -> bool {
        self.close.contains_key(ticker)
    }

    pub fn close(&self, ticker: &Ticker) -> Option<&[Option<f64>]> {
        self.close.get(ticker).map(Vec::as_slice)
    }

    pub fn high(&self, ticker: &Ticker) -> Option<&[Option<f64>]> {
        self.high.get(ticker).map(Vec::as_slice)
    }

    pub fn volume(&self, ticker: &Ticker) -> Option<&[Option<f64>]> {
        self.volume.get(ticker).map(Vec::as_slice)
    }

    /// Deterministic BLAKE3 hash over dates and all column values.
    pub fn dataset_hash(&self) -> DatasetHash {
        let mut hasher = blake3::Hasher::new();
        for date in &self.dates {
            hasher.update(date.to_string().as_bytes());
        }
        for (ticker, close) in &self.close {
            hasher.update(ticker.as_str().as_bytes());
            let columns = [
                close.as_slice(),
                self.high[ticker].as_slice(),
                self.volume[ticker].as_slice(),
            ];
            for column in columns {
                for value in column {
                    match value {
                        Some(v) => hasher.update(&v.to_le_bytes()),
                        None => hasher.update(b"\xff"),
                    };
                }
            }
        }
        DatasetHash(hasher.finalize().to_hex().to_string())
    }
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Bar;

    fn bar(date: &str, close: f64) -> Bar {
        Bar {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            open: Some(close - 1.0),
            high: Some(close + 1.0),
            low: Some(close - 2.0),
            close: Some(close),
            volume: Some(1000.0),
        }
    }

    fn frames(input: Vec<(&str, Vec<Bar>)>) -> BTreeMap<Ticker, TickerFrame> {
        input
            .into_iter()
            .map(|(t, bars)| (Ticker::new(t), TickerFrame::new(Ticker::new(t), bars)))
            .collect()
    }

    #[test]
    fn outer_join_leaves_gaps_as_missing() {
        let panel = Panel::assemble(&frames(vec![
            (
                "SPY",
                vec![
                    bar("2024-01-02", 100.0),
                    bar("2024-01-03", 101.0),
                    bar("2024-01-04", 102.0),
                ],
            ),
            (
                "QQQ",
                vec![
                    bar("2024-01-02", 200.0),
                    // QQQ missing 2024-01-03
                    bar("2024-01-04", 202.0),
                ],
            ),
        ]));

        assert_eq!(panel.len(), 3);
        let qqq = Ticker::new("QQQ");
        assert_eq!(panel.close(&qqq).unwrap().len(), 3);
        assert_eq!(panel.close(&qqq).unwrap()[1], None);
        assert_eq!(panel.high(&qqq).unwrap()[1], None);
        assert_eq!(panel.volume(&qqq).unwrap()[1], None);
        assert_eq!(panel.close(&Ticker::new("SPY")).unwrap()[1], Some(101.0));
    }

    #[test]
    fn date_axis_is_sorted_union() {
        let panel = Panel::assemble(&frames(vec![
            ("A", vec![bar("2024-01-05", 1.0), bar("2024-01-02", 1.0)]),
            ("B", vec![bar("2024-01-03", 1.0), bar("2024-01-09", 1.0)]),
        ]));
        let days: Vec<String> = panel.dates().iter().map(|d| d.to_string()).collect();
        assert_eq!(
            days,
            vec!["2024-01-02", "2024-01-03", "2024-01-05", "2024-01-09"]
        );
        for ticker in panel.tickers() {
            assert_eq!(panel.close(ticker).unwrap().len(), panel.len());
        }
    }

    #[test]
    fn nan_values_become_missing() {
        let mut b = bar("2024-01-02", 100.0);
        b.close = Some(f64::NAN);
        let panel = Panel::assemble(&frames(vec![("SPY", vec![b])]));
        assert_eq!(panel.close(&Ticker::new("SPY")).unwrap()[0], None);
        assert_eq!(panel.high(&Ticker::new("SPY")).unwrap()[0], Some(101.0));
    }

    #[test]
    fn dataset_hash_is_deterministic() {
        let input = || {
            frames(vec![
                ("SPY", vec![bar("2024-01-02", 100.0)]),
                ("QQQ", vec![bar("2024-01-03", 200.0)]),
            ])
        };
        let a = Panel::assemble(&input());
        let b = Panel::assemble(&input());
        assert_eq!(a.dataset_hash(), b.dataset_hash());

        let c = Panel::assemble(&frames(vec![("SPY", vec![bar("2024-01-02", 100.5)])]));
        assert_ne!(a.dataset_hash(), c.dataset_hash());
    }

    #[test]
    fn empty_input_gives_empty_panel() {
        let panel = Panel::assemble(&BTreeMap::new());
        assert!(panel.is_empty());
        assert_eq!(panel.ticker_count(), 0);
        assert_eq!(panel.last_date(), None);
    }
}
