//! Yahoo Finance daily-bar client.
//!
//! Fetches the v8 chart endpoint for a fixed historical range and flattens
//! the column-oriented payload into cleaned, chronologically ordered
//! [`PriceRow`]s. Entries with any null field are dropped here, before
//! windowing ever sees them.

use crate::domain::ports::PriceHistoryService;
use crate::domain::types::PriceRow;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

pub struct YahooFinanceService {
    client: Client,
    base_url: String,
    start: NaiveDate,
    end: NaiveDate,
}

impl YahooFinanceService {
    pub fn new(start: NaiveDate, end: NaiveDate, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent("stockcast/0.1")
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            start,
            end,
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

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

#[derive(Debug, Default, Deserialize)]
struct Quote {
    open: Option<Vec<Option<f64>>>,
    high: Option<Vec<Option<f64>>>,
    low: Option<Vec<Option<f64>>>,
    close: Option<Vec<Option<f64>>>,
    volume: Option<Vec<Option<f64>>>,
}

fn rows_from_chart(result: ChartResult) -> Vec<PriceRow> {
    let timestamps = result.timestamp.unwrap_or_default();
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let open = quote.open.unwrap_or_default();
    let high = quote.high.unwrap_or_default();
    let low = quote.low.unwrap_or_default();
    let close = quote.close.unwrap_or_default();
    let volume = quote.volume.unwrap_or_default();

    let mut rows = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let date = match DateTime::from_timestamp(ts, 0) {
            Some(dt) => dt.date_naive(),
            None => continue,
        };
        let fields = (
            open.get(i).copied().flatten(),
            high.get(i).copied().flatten(),
            low.get(i).copied().flatten(),
            close.get(i).copied().flatten(),
            volume.get(i).copied().flatten(),
        );
        // Any missing field drops the whole row.
        if let (Some(open), Some(high), Some(low), Some(close), Some(volume)) = fields {
            rows.push(PriceRow {
                date,
                open,
                high,
                low,
                close,
                volume,
            });
        }
    }
    rows
}

#[async_trait]
impl PriceHistoryService for YahooFinanceService {
    async fn fetch_daily(&self, ticker: &str) -> Result<Vec<PriceRow>> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, ticker);
        let period1 = self
            .start
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or(0);
        let period2 = self
            .end
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or(0);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("interval", "1d".to_string()),
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
            ])
            .send()
            .await
            .with_context(|| format!("Chart request for {} failed", ticker))?;

        // Unknown symbols come back as 404 with an error body; treat both
        // as "no data" rather than a hard failure.
        if !response.status().is_success() {
            warn!(ticker, status = %response.status(), "Chart request rejected");
            return Ok(Vec::new());
        }

        let payload: ChartResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse chart response for {}", ticker))?;

        if let Some(err) = payload.chart.error {
            warn!(ticker, error = %err, "Chart payload carried an error");
            return Ok(Vec::new());
        }

        let rows = payload
            .chart
            .result
            .unwrap_or_default()
            .into_iter()
            .next()
            .map(rows_from_chart)
            .unwrap_or_default();

        debug!(ticker, rows = rows.len(), "Fetched daily bars");
        Ok(rows)
    }
}
