//! Yahoo Finance chart API provider
//!
//! Intraday bars for NSE indices and stocks. The chart payload is a set of
//! parallel arrays; rows with a missing price are dropped.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{FetchRequest, Interval, Lookback, MarketDataProvider, ProviderError};
use crate::signal_core::Bar;

/// Default chart API host
pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) vwap-screener";

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
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

fn interval_code(interval: Interval) -> &'static str {
    match interval {
        Interval::OneMinute => "1m",
        Interval::FiveMinutes => "5m",
        Interval::FifteenMinutes => "15m",
    }
}

fn range_param(lookback: Lookback) -> String {
    match lookback {
        Lookback::Days(days) => format!("{}d", days.max(1)),
        Lookback::Bars(_) => "5d".to_string(),
    }
}

fn at(values: &[Option<f64>], i: usize) -> Option<f64> {
    values.get(i).copied().flatten()
}

/// Turn a chart payload into bars, marking the newest bar incomplete when
/// its interval has not elapsed at `now`
fn parse_chart(envelope: ChartEnvelope, interval: Interval, now: DateTime<Utc>) -> Result<Vec<Bar>, ProviderError> {
    if let Some(err) = envelope.chart.error {
        return Err(ProviderError::Api(format!("{}: {}", err.code, err.description)));
    }

    let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

    let span = chrono::Duration::from_std(interval.duration())
        .map_err(|e| ProviderError::Parse(e.to_string()))?;

    let mut bars = Vec::with_capacity(result.timestamp.len());
    for (i, ts) in result.timestamp.iter().enumerate() {
        let (Some(open), Some(high), Some(low), Some(close)) = (
            at(&quote.open, i),
            at(&quote.high, i),
            at(&quote.low, i),
            at(&quote.close, i),
        ) else {
            continue;
        };

        let timestamp = DateTime::from_timestamp(*ts, 0)
            .ok_or_else(|| ProviderError::Parse(format!("bad timestamp {}", ts)))?;
        let volume = at(&quote.volume, i).map(|v| v.max(0.0) as u64).unwrap_or(0);

        bars.push(Bar {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            complete: timestamp + span <= now,
        });
    }

    Ok(bars)
}

pub struct YahooProvider {
    client: Client,
    base_url: String,
}

impl YahooProvider {
    /// Create a provider whose every request is bounded by `timeout`
    pub fn new(timeout: Duration) -> Result<Self, ProviderError> {
        Self::with_base_url(DEFAULT_BASE_URL, timeout)
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl MarketDataProvider for YahooProvider {
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Bar>, ProviderError> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, request.symbol);
        let range = range_param(request.lookback);

        let response = self
            .client
            .get(&url)
            .query(&[("interval", interval_code(request.interval)), ("range", range.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api(format!("{} {}: {}", request.symbol, status, body)));
        }

        let envelope: ChartEnvelope = response.json().await?;
        let mut bars = parse_chart(envelope, request.interval, Utc::now())?;

        if let Lookback::Bars(n) = request.lookback {
            let excess = bars.len().saturating_sub(n as usize);
            bars.drain(..excess);
        }

        debug!("yahoo {} -> {} bars", request.symbol, bars.len());
        Ok(bars)
    }

    fn name(&self) -> &'static str {
        "yahoo"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SAMPLE: &str = r#"{
        "chart": {
            "result": [{
                "meta": {"symbol": "^NSEI"},
                "timestamp": [1741059900, 1741060200, 1741060500, 1741060800],
                "indicators": {
                    "quote": [{
                        "open":   [22100.0, 22110.0, null, 22120.5],
                        "high":   [22115.0, 22125.0, null, 22130.0],
                        "low":    [22095.0, 22105.0, null, 22118.0],
                        "close":  [22110.0, 22120.0, null, 22125.0],
                        "volume": [1200, null, 0, 800]
                    }]
                }
            }],
            "error": null
        }
    }"#;

    #[test]
    fn test_parse_chart_drops_null_rows_and_marks_live_bar() {
        let envelope: ChartEnvelope = serde_json::from_str(SAMPLE).unwrap();
        // One minute into the last bar
        let now = Utc.timestamp_opt(1741060860, 0).unwrap();

        let bars = parse_chart(envelope, Interval::FiveMinutes, now).unwrap();
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].volume, 1200);
        assert_eq!(bars[1].volume, 0);
        assert!(bars[0].complete);
        assert!(bars[1].complete);
        assert!(!bars[2].complete);
        assert_eq!(bars[2].close, 22125.0);
    }

    #[test]
    fn test_parse_chart_error_payload() {
        let body = r#"{"chart": {"result": null, "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}}}"#;
        let envelope: ChartEnvelope = serde_json::from_str(body).unwrap();
        let err = parse_chart(envelope, Interval::FiveMinutes, Utc::now()).unwrap_err();
        assert!(matches!(err, ProviderError::Api(msg) if msg.contains("Not Found")));
    }

    #[test]
    fn test_empty_result_is_no_data() {
        let body = r#"{"chart": {"result": [], "error": null}}"#;
        let envelope: ChartEnvelope = serde_json::from_str(body).unwrap();
        assert!(parse_chart(envelope, Interval::FiveMinutes, Utc::now()).unwrap().is_empty());
    }

    #[test]
    fn test_range_param() {
        assert_eq!(range_param(Lookback::Days(1)), "1d");
        assert_eq!(range_param(Lookback::Days(0)), "1d");
        assert_eq!(range_param(Lookback::Bars(120)), "5d");
        assert_eq!(interval_code(Interval::FiveMinutes), "5m");
    }
}
