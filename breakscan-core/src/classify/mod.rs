//! Breakout classification and ranking.
//!
//! A ticker qualifies when its close is within `soft_breakout_pct` of the
//! rolling high (or above it) and today's volume beats its rolling average
//! by more than `volume_threshold`. Rows with any undefined feature are
//! dropped before the rule is applied.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

use crate::config::ScreenConfig;
use crate::domain::Ticker;
use crate::features::{FeatureRow, FeatureSet};

/// One qualifying ticker, rounded for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakoutCandidate {
    pub ticker: Ticker,
    pub price: f64,
    pub high_52w: f64,
    /// Proximity in percent; negative means the close is above the prior high.
    pub dist_to_high_pct: f64,
    pub volume_ratio: f64,
    pub rs_score: f64,
}

impl BreakoutCandidate {
    /// Whether this candidate sits inside a tighter near-high tier.
    ///
    /// Not part of selection; callers use it to split "hard" from "soft"
    /// breakouts themselves.
    pub fn is_near_high(&self, proximity_threshold: f64) -> bool {
        self.dist_to_high_pct <= round2(proximity_threshold * 100.0)
    }
}

/// Fully defined features of one row, unrounded.
struct Qualified<'a> {
    ticker: &'a Ticker,
    close: f64,
    rolling_high: f64,
    proximity: f64,
    volume_ratio: f64,
    rs_momentum: f64,
}

impl<'a> Qualified<'a> {
    fn from_row(row: &'a FeatureRow) -> Option<Self> {
        Some(Self {
            ticker: &row.ticker,
            close: row.close?,
            rolling_high: row.rolling_high?,
            proximity: row.proximity?,
            volume_ratio: row.volume_ratio?,
            rs_momentum: row.rs_momentum?,
        })
    }

    fn into_candidate(self) -> BreakoutCandidate {
        BreakoutCandidate {
            ticker: self.ticker.clone(),
            price: round2(self.close),
            high_52w: round2(self.rolling_high),
            dist_to_high_pct: round2(self.proximity * 100.0),
            volume_ratio: round2(self.volume_ratio),
            rs_score: round2(self.rs_momentum),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakoutClassifier {
    soft_breakout_pct: f64,
    volume_threshold: f64,
}

impl BreakoutClassifier {
    pub fn new(config: &ScreenConfig) -> Self {
        Self {
            soft_breakout_pct: config.soft_breakout_pct,
            volume_threshold: config.volume_threshold,
        }
    }

    fn qualifies(&self, row: &Qualified<'_>) -> bool {
        row.proximity <= self.soft_breakout_pct && row.volume_ratio > self.volume_threshold
    }

    /// Select and rank candidates, closest to (or furthest above) the high first.
    ///
    /// Deterministic: equal distances are ordered by ticker.
    pub fn classify(&self, features: &FeatureSet) -> Vec<BreakoutCandidate> {
        let mut selected: Vec<Qualified<'_>> = features
            .rows
            .iter()
            .filter_map(|row| {
                let q = Qualified::from_row(row);
                if q.is_none() {
                    debug!(ticker = %row.ticker, "incomplete features, skipping");
                }
                q
            })
            .filter(|q| self.qualifies(q))
            .collect();

        selected.sort_by(|a, b| {
            a.proximity
                .partial_cmp(&b.proximity)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.ticker.cmp(b.ticker))
        });

        selected.into_iter().map(Qualified::into_candidate).collect()
    }
}

/// Round to 2 decimal places, ties to even.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}
