//! Serializable screen configuration.
//!
//! Every tunable of the pipeline lives here and is passed explicitly into
//! the entry points, so tests can vary thresholds without global state.
//! Loadable from TOML; missing keys fall back to the defaults below.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::ScreenError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    /// Maximum fractional distance below the rolling high to qualify.
    pub soft_breakout_pct: f64,
    /// Tighter "near high" tier. Not part of the selection predicate.
    pub proximity_threshold: f64,
    /// Volume ratio must be strictly above this.
    pub volume_threshold: f64,
    /// Rolling-high window in rows, and the default history span in calendar days.
    pub lookback_days: usize,
    /// RS momentum endpoint offset from the most recent bar.
    pub skip_recent_days: usize,
    /// Rolling average volume window; also its minimum observation count.
    pub volume_window: usize,
    /// Relative strength denominator.
    pub benchmark: String,
    pub batch_size: usize,
    /// Pause after every batch, in seconds.
    pub sleep_between_batches: f64,
    /// Total download attempts per batch.
    pub retries: u32,
    /// Fixed delay between attempts, in seconds.
    pub retry_delay: f64,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            soft_breakout_pct: 0.15,
            proximity_threshold: 0.05,
            volume_threshold: 1.0,
            lookback_days: 365,
            skip_recent_days: 0,
            volume_window: 50,
            benchmark: "SPY".into(),
            batch_size: 101,
            sleep_between_batches: 1.0,
            retries: 3,
            retry_delay: 2.0,
        }
    }
}

impl ScreenConfig {
    /// Load a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ScreenError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ScreenError::Config(format!("read {}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    /// Parse a config from a TOML string and validate it.
    pub fn from_toml(content: &str) -> Result<Self, ScreenError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ScreenError::Config(format!("parse config TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ScreenError> {
        toml::to_string_pretty(self).map_err(|e| ScreenError::Config(format!("serialize: {e}")))
    }

    pub fn validate(&self) -> Result<(), ScreenError> {
        let fail = |msg: &str| Err(ScreenError::Config(msg.to_string()));
        if self.batch_size == 0 {
            return fail("batch_size must be >= 1");
        }
        if self.retries == 0 {
            return fail("retries must be >= 1");
        }
        if self.lookback_days == 0 {
            return fail("lookback_days must be >= 1");
        }
        if self.volume_window == 0 {
            return fail("volume_window must be >= 1");
        }
        if self.benchmark.trim().is_empty() {
            return fail("benchmark must not be empty");
        }
        let non_negative = [
            ("soft_breakout_pct", self.soft_breakout_pct),
            ("proximity_threshold", self.proximity_threshold),
            ("volume_threshold", self.volume_threshold),
            ("sleep_between_batches", self.sleep_between_batches),
            ("retry_delay", self.retry_delay),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ScreenError::Config(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        let pauses = [
            ("sleep_between_batches", self.sleep_between_batches),
            ("retry_delay", self.retry_delay),
        ];
        for (name, seconds) in pauses {
            if Duration::try_from_secs_f64(seconds).is_err() {
                return Err(ScreenError::Config(format!(
                    "{name} is not a representable duration: {seconds}s"
                )));
            }
        }
        Ok(())
    }

    /// Zero for an invalid value; `validate` rejects those up front.
    pub fn batch_pause(&self) -> Duration {
        Duration::try_from_secs_f64(self.sleep_between_batches).unwrap_or_default()
    }

    pub fn retry_pause(&self) -> Duration {
        Duration::try_from_secs_f64(self.retry_delay).unwrap_or_default()
    }

    /// Default history window ending at `end`: `lookback_days` calendar days.
    pub fn default_range(&self, end: NaiveDate) -> (NaiveDate, NaiveDate) {
        let start = end - chrono::Duration::days(self.lookback_days as i64);
        (start, end)
    }

    /// Deterministic hash of this configuration, logged as a run fingerprint.
    pub fn config_hash(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}
