//! Yahoo Finance batch source.
//!
//! Fetches daily bars from Yahoo's v8 chart API, one request per ticker,
//! with the tickers of a batch fetched in parallel on a dedicated rayon
//! pool. OHLC are rescaled by the adjusted-close ratio so splits and
//! dividends do not show up as fake breakouts.
//!
//! Yahoo Finance has no official API and is subject to unannounced format
//! changes; `ResponseFormatChanged` is the canary for that.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::circuit_breaker::CircuitBreaker;
use super::provider::{BatchData, BatchSource, DataError, DataSource};
use crate::domain::{Bar, Ticker, TickerFrame};

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

pub struct YahooSource {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    pool: rayon::ThreadPool,
}

impl YahooSource {
    /// `threads` bounds the number of concurrent requests within one batch.
    pub fn new(circuit_breaker: Arc<CircuitBreaker>, threads: usize) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("yahoo-fetch-{i}"))
            .build()
            .map_err(|e| DataError::Other(format!("failed to build fetch pool: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
            pool,
        })
    }

    /// Chart API URL for `[start, end)`.
    fn chart_url(symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = start.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
        let end_ts = end.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
        format!(
            "https://query2.finance.yahoo.com/v8/finance/chart/{symbol}\
             ?period1={start_ts}&period2={end_ts}&interval=1d\
             &includeAdjustedClose=true&events=div%2Csplits"
        )
    }

    fn parse_response(symbol: &str, resp: ChartResponse) -> Result<Vec<Bar>, DataError> {
        let result = resp.chart.result.ok_or_else(|| match resp.chart.error {
            Some(err) if err.code == "Not Found" => DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            },
            Some(err) => {
                DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
            }
            None => DataError::ResponseFormatChanged("empty result with no error".into()),
        })?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))?;

        // A listed symbol with no trades in range has no timestamps at all
        let Some(timestamps) = data.timestamp else {
            return Ok(Vec::new());
        };

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("no quote data".into()))?;

        let adj_closes = data
            .indicators
            .adjclose
            .and_then(|v| v.into_iter().next())
            .map(|a| a.adjclose);

        let at = |series: &[Option<f64>], i: usize| series.get(i).copied().flatten();

        let mut bars = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.naive_utc().date())
                .ok_or_else(|| {
                    DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
                })?;

            let close = at(&quote.close, i);
            let adj_close = adj_closes.as_deref().and_then(|v| at(v, i));
            let ratio = match (close, adj_close) {
                (Some(c), Some(a)) if c > 0.0 => a / c,
                _ => 1.0,
            };
            let adjust = |v: Option<f64>| v.map(|x| x * ratio);

            bars.push(Bar {
                date,
                open: adjust(at(&quote.open, i)),
                high: adjust(at(&quote.high, i)),
                low: adjust(at(&quote.low, i)),
                close: adjust(close),
                volume: at(&quote.volume, i),
            });
        }

        Ok(bars)
    }

    /// One request for one ticker. No retry here: the batch retry machine
    /// owns that.
    fn fetch_symbol(
        &self,
        ticker: &Ticker,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, DataError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(DataError::CircuitBreakerTripped);
        }

        let url = Self::chart_url(ticker.as_str(), start, end);
        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::FORBIDDEN {
            // IP ban, stop hammering
            self.circuit_breaker.trip();
            return Err(DataError::CircuitBreakerTripped);
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(DataError::RateLimited { retry_after_secs });
        }
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(DataError::AuthenticationRequired(
                "Yahoo Finance requires authentication".into(),
            ));
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(DataError::SymbolNotFound {
                symbol: ticker.to_string(),
            });
        }
        if !status.is_success() {
            return Err(DataError::Other(format!("HTTP {status} for {ticker}")));
        }

        let chart: ChartResponse = resp.json().map_err(|e| {
            DataError::ResponseFormatChanged(format!("failed to parse response for {ticker}: {e}"))
        })?;
        Self::parse_response(ticker.as_str(), chart)
    }
}

impl BatchSource for YahooSource {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    /// Unknown symbols are dropped from the batch; any other per-ticker
    /// error fails the whole attempt.
    fn download(
        &self,
        tickers: &[Ticker],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BatchData, DataError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(DataError::CircuitBreakerTripped);
        }

        let results: Vec<(Ticker, Result<Vec<Bar>, DataError>)> = self.pool.install(|| {
            tickers
                .par_iter()
                .map(|t| (t.clone(), self.fetch_symbol(t, start, end)))
                .collect()
        });
        self.circuit_breaker
            .record_attempt(results.iter().filter_map(|(_, r)| r.as_ref().err()));

        let mut data = BatchData::new(DataSource::YahooFinance);
        for (ticker, result) in results {
            match result {
                Ok(bars) => data.insert(TickerFrame::new(ticker, bars)),
                Err(DataError::SymbolNotFound { symbol }) => {
                    debug!(%symbol, "symbol not found, dropping from batch");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(data)
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "chart": {
            "result": [{
                "timestamp": [1704205800, 1704292200, 1704378600],
                "indicators": {
                    "quote": [{
                        "open":   [100.0, null, 102.0],
                        "high":   [101.0, null, 104.0],
                        "low":    [99.0,  null, 101.0],
                        "close":  [100.0, null, 103.0],
                        "volume": [1000,  null, 3000]
                    }],
                    "adjclose": [{ "adjclose": [50.0, null, 103.0] }]
                }
            }],
            "error": null
        }
    }"#;

    #[test]
    fn parses_chart_and_applies_adjustment() {
        let resp: ChartResponse = serde_json::from_str(SAMPLE).unwrap();
        let bars = YahooSource::parse_response("SPY", resp).unwrap();
        assert_eq!(bars.len(), 3);

        // Day 1 adjusted by 0.5
        assert_eq!(bars[0].close, Some(50.0));
        assert_eq!(bars[0].high, Some(50.5));
        assert_eq!(bars[0].volume, Some(1000.0));

        // Day 2 is all-null: kept as a void bar, dropped later by TickerFrame
        assert!(bars[1].is_void());

        // Day 3 unadjusted (ratio 1)
        assert_eq!(bars[2].close, Some(103.0));
        assert_eq!(bars[2].date, NaiveDate::from_ymd_opt(2024, 1, 4).unwrap());

        let frame = TickerFrame::new(Ticker::new("SPY"), bars);
        assert_eq!(frame.len(), 2);
    }

    #[test]
    fn not_found_error_maps_to_symbol_not_found() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let resp: ChartResponse = serde_json::from_str(body).unwrap();
        let err = YahooSource::parse_response("ZZZZ", resp).unwrap_err();
        assert!(matches!(err, DataError::SymbolNotFound { symbol } if symbol == "ZZZZ"));
    }

    #[test]
    fn other_chart_error_is_format_change() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Bad Request","description":"Invalid input"}}}"#;
        let resp: ChartResponse = serde_json::from_str(body).unwrap();
        let err = YahooSource::parse_response("SPY", resp).unwrap_err();
        assert!(matches!(err, DataError::ResponseFormatChanged(_)));
    }

    #[test]
    fn chart_url_uses_half_open_range() {
        let url = YahooSource::chart_url(
            "BRK-B",
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        );
        assert!(url.contains("/chart/BRK-B?"));
        assert!(url.contains("period1=1704067200"));
        assert!(url.contains("period2=1704153600"));
    }
}
