//! Ticker universe — the ordered list of symbols to screen.
//!
//! Sources: explicit symbols, a plain-text list, a sector-organized TOML
//! file, or the S&P 500 constituents table on Wikipedia. Every source goes
//! through the same normalization and order-preserving dedup.

use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::time::Duration;

use super::provider::DataError;
use crate::domain::Ticker;
use crate::error::ScreenError;

const SP500_URL: &str = "https://en.wikipedia.org/wiki/List_of_S%26P_500_companies";

/// Sector-organized TOML layout:
///
/// ```toml
/// [sectors]
/// Technology = ["AAPL", "MSFT"]
/// ETFs = ["SPY"]
/// ```
#[derive(Debug, Deserialize)]
struct SectorFile {
    sectors: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Universe {
    tickers: Vec<Ticker>,
}

impl Universe {
    /// Normalize and dedup, keeping first-seen order. Blank symbols are dropped.
    pub fn from_symbols<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let tickers = symbols
            .into_iter()
            .map(|s| Ticker::new(s.as_ref()))
            .filter(|t| !t.is_empty() && seen.insert(t.clone()))
            .collect();
        Self { tickers }
    }

    /// One symbol per line; `#` starts a comment.
    pub fn from_text(content: &str) -> Self {
        Self::from_symbols(
            content
                .lines()
                .map(|line| line.split('#').next().unwrap_or_default().trim()),
        )
    }

    /// Parse a sector table; sectors are flattened in name order.
    pub fn from_toml(content: &str) -> Result<Self, ScreenError> {
        let file: SectorFile = toml::from_str(content)
            .map_err(|e| ScreenError::Config(format!("parse universe TOML: {e}")))?;
        Ok(Self::from_symbols(file.sectors.into_values().flatten()))
    }

    /// Load from a file: `.toml` is a sector table, anything else a plain list.
    pub fn from_file(path: &Path) -> Result<Self, ScreenError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ScreenError::Config(format!("read universe file {}: {e}", path.display())))?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml(&content),
            _ => Ok(Self::from_text(&content)),
        }
    }

    /// Fetch the current S&P 500 constituents from Wikipedia.
    pub fn sp500() -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0")
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;
        let resp = client
            .get(SP500_URL)
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(DataError::Other(format!(
                "HTTP {} fetching S&P 500 list",
                resp.status()
            )));
        }
        let html = resp
            .text()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;
        Self::parse_sp500_table(&html)
    }

    /// Extract the `Symbol` column of the first table that has one.
    pub fn parse_sp500_table(html: &str) -> Result<Self, DataError> {
        let document = Html::parse_document(html);
        let table_sel = selector("table")?;
        let row_sel = selector("tr")?;
        let header_sel = selector("th")?;
        let cell_sel = selector("td")?;

        for table in document.select(&table_sel) {
            let mut rows = table.select(&row_sel);
            let Some(header) = rows.next() else {
                continue;
            };
            let Some(symbol_col) = header
                .select(&header_sel)
                .position(|th| cell_text(th) == "Symbol")
            else {
                continue;
            };

            let symbols: Vec<String> = rows
                .filter_map(|row| row.select(&cell_sel).nth(symbol_col).map(cell_text))
                .collect();
            return Ok(Self::from_symbols(symbols));
        }

        Err(DataError::ResponseFormatChanged(
            "could not find the S&P 500 table".into(),
        ))
    }

    /// Append the benchmark if absent, so relative strength can be computed.
    pub fn with_benchmark(mut self, benchmark: &Ticker) -> Self {
        if !self.tickers.contains(benchmark) {
            self.tickers.push(benchmark.clone());
        }
        self
    }

    pub fn tickers(&self) -> &[Ticker] {
        &self.tickers
    }

    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }

    pub fn contains(&self, ticker: &Ticker) -> bool {
        self.tickers.contains(ticker)
    }
}

fn selector(css: &str) -> Result<Selector, DataError> {
    Selector::parse(css).map_err(|e| DataError::Other(format!("invalid selector {css}: {e:?}")))
}

fn cell_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}
