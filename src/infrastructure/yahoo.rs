//! Yahoo Finance historical-bars client (v8 chart API, unauthenticated).
//!
//! One request per ticker: `GET /v8/finance/chart/{symbol}` with an epoch
//! range and `interval=1d`. Yahoo reports per-day nulls for halted or
//! partially reported days; those become NaN prices here and are imputed
//! by the movement extractor, never silently dropped.

use crate::domain::ports::HistoricalDataSource;
use crate::domain::types::DailyBar;
use crate::infrastructure::core::http::{retrying_client, url_with_query};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use tracing::{debug, info};

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

pub struct YahooFinanceSource {
    client: ClientWithMiddleware,
    base_url: String,
}

impl YahooFinanceSource {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Overridable base URL, used to point tests at a local stub.
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: retrying_client(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl Default for YahooFinanceSource {
    fn default() -> Self {
        Self::new()
    }
}

// ===== Wire format =====

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

/// Per-field arrays aligned with `timestamp`; individual entries may be
/// null for days Yahoo could not fill.
#[derive(Debug, Deserialize)]
struct Quote {
    open: Option<Vec<Option<f64>>>,
    high: Option<Vec<Option<f64>>>,
    low: Option<Vec<Option<f64>>>,
    close: Option<Vec<Option<f64>>>,
    volume: Option<Vec<Option<f64>>>,
}

fn price_at(field: &Option<Vec<Option<f64>>>, i: usize) -> f64 {
    field
        .as_ref()
        .and_then(|v| v.get(i).copied().flatten())
        .unwrap_or(f64::NAN)
}

#[async_trait]
impl HistoricalDataSource for YahooFinanceSource {
    async fn daily_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyBar>> {
        let period1 = start
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or_default()
            .to_string();
        let period2 = end
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or_default()
            .to_string();

        let base = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        let url = url_with_query(
            &base,
            [
                ("period1", period1.as_str()),
                ("period2", period2.as_str()),
                ("interval", "1d"),
                ("events", "history"),
            ],
        )?;

        let response = self
            .client
            .get(url)
            .header("User-Agent", "stock-clusters/0.3")
            .send()
            .await
            .with_context(|| format!("Failed to fetch chart data for {}", symbol))?;

        // Yahoo answers 404 for unknown or delisted symbols; that is
        // "no data", not a fetch failure.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            debug!(symbol, "chart API returned 404; treating as empty");
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("chart API request for {} failed ({}): {}", symbol, status, body);
        }

        let parsed: ChartResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse chart response for {}", symbol))?;

        if let Some(err) = parsed.chart.error {
            debug!(symbol, error = %err, "chart API reported an error; treating as empty");
            return Ok(Vec::new());
        }

        let Some(result) = parsed.chart.result.and_then(|mut r| {
            if r.is_empty() {
                None
            } else {
                Some(r.remove(0))
            }
        }) else {
            return Ok(Vec::new());
        };

        let timestamps = result.timestamp.unwrap_or_default();
        let Some(quote) = result.indicators.quote.first() else {
            return Ok(Vec::new());
        };

        let mut bars = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let Some(date) = DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive()) else {
                continue;
            };
            // Defensive end-exclusive filter; Yahoo usually honors period2
            // but off-by-one-day responses around DST changes do happen.
            if date < start || date >= end {
                continue;
            }
            bars.push(DailyBar {
                date,
                open: price_at(&quote.open, i),
                high: price_at(&quote.high, i),
                low: price_at(&quote.low, i),
                close: price_at(&quote.close, i),
                volume: price_at(&quote.volume, i),
            });
        }

        info!(symbol, bars = bars.len(), "fetched daily bars");
        Ok(bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_chart_response_with_nulls() {
        let raw = r#"{
            "chart": {
                "result": [{
                    "timestamp": [1420185600, 1420444800],
                    "indicators": {
                        "quote": [{
                            "open": [100.0, null],
                            "high": [101.0, 102.0],
                            "low": [99.0, 100.0],
                            "close": [100.5, 101.5],
                            "volume": [1000.0, 2000.0]
                        }]
                    }
                }],
                "error": null
            }
        }"#;

        let parsed: ChartResponse = serde_json::from_str(raw).unwrap();
        let result = &parsed.chart.result.as_ref().unwrap()[0];
        let quote = &result.indicators.quote[0];

        assert_eq!(price_at(&quote.open, 0), 100.0);
        assert!(price_at(&quote.open, 1).is_nan());
        assert_eq!(price_at(&quote.close, 1), 101.5);
    }

    #[test]
    fn parses_error_response() {
        let raw = r#"{
            "chart": {
                "result": null,
                "error": {"code": "Not Found", "description": "No data found"}
            }
        }"#;
        let parsed: ChartResponse = serde_json::from_str(raw).unwrap();
        assert!(parsed.chart.error.is_some());
        assert!(parsed.chart.result.is_none());
    }
}
