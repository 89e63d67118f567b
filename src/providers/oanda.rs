//! OANDA v20 candles provider for the commodity universe

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{FetchRequest, Interval, Lookback, MarketDataProvider, ProviderError};
use crate::signal_core::Bar;

pub const PRACTICE_URL: &str = "https://api-fxpractice.oanda.com";
pub const LIVE_URL: &str = "https://api-fxtrade.oanda.com";

/// OANDA caps a single candles request at 5000
const MAX_COUNT: u32 = 5000;

#[derive(Debug, Deserialize)]
struct CandlesResponse {
    #[serde(default)]
    candles: Vec<Candle>,
}

#[derive(Debug, Deserialize)]
struct Candle {
    complete: bool,
    volume: u64,
    time: DateTime<Utc>,
    mid: Option<Mid>,
}

/// Mid prices arrive as decimal strings
#[derive(Debug, Deserialize)]
struct Mid {
    o: String,
    h: String,
    l: String,
    c: String,
}

/// Screener symbol to OANDA instrument name
pub fn instrument_for(symbol: &str) -> Option<&'static str> {
    match symbol {
        "XAUUSD" => Some("XAU_USD"),
        "BTCUSD" => Some("BTC_USD"),
        _ => None,
    }
}

fn granularity(interval: Interval) -> &'static str {
    match interval {
        Interval::OneMinute => "M1",
        Interval::FiveMinutes => "M5",
        Interval::FifteenMinutes => "M15",
    }
}

fn count_for(lookback: Lookback, interval: Interval) -> u32 {
    let count = match lookback {
        Lookback::Bars(n) => n,
        Lookback::Days(days) => days.saturating_mul(interval.bars_per_day()),
    };
    count.clamp(1, MAX_COUNT)
}

fn price(field: &str, raw: &str) -> Result<f64, ProviderError> {
    raw.parse()
        .map_err(|_| ProviderError::Parse(format!("mid.{} = {:?}", field, raw)))
}

/// Keep only finished candles; the forming candle is never reported
fn parse_candles(response: CandlesResponse) -> Result<Vec<Bar>, ProviderError> {
    let mut bars = Vec::with_capacity(response.candles.len());
    for candle in response.candles.into_iter().filter(|c| c.complete) {
        let Some(mid) = candle.mid else {
            continue;
        };
        bars.push(Bar {
            timestamp: candle.time,
            open: price("o", &mid.o)?,
            high: price("h", &mid.h)?,
            low: price("l", &mid.l)?,
            close: price("c", &mid.c)?,
            volume: candle.volume,
            complete: true,
        });
    }
    Ok(bars)
}

pub struct OandaProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OandaProvider {
    /// `account_type` "practice" selects the practice host, anything else live
    pub fn new(api_key: &str, account_type: &str, timeout: Duration) -> Result<Self, ProviderError> {
        if api_key.is_empty() {
            return Err(ProviderError::MissingCredentials("OANDA_API_KEY"));
        }

        let base_url = if account_type.eq_ignore_ascii_case("practice") {
            PRACTICE_URL
        } else {
            LIVE_URL
        };

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl MarketDataProvider for OandaProvider {
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Bar>, ProviderError> {
        let instrument = instrument_for(&request.symbol)
            .ok_or_else(|| ProviderError::UnknownInstrument(request.symbol.clone()))?;

        let url = format!("{}/v3/instruments/{}/candles", self.base_url, instrument);
        let count = count_for(request.lookback, request.interval).to_string();

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .query(&[
                ("granularity", granularity(request.interval)),
                ("count", count.as_str()),
                ("price", "M"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api(format!("{} {}: {}", instrument, status, body)));
        }

        let payload: CandlesResponse = response.json().await?;
        let bars = parse_candles(payload)?;

        debug!("oanda {} -> {} bars", instrument, bars.len());
        Ok(bars)
    }

    fn name(&self) -> &'static str {
        "oanda"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_candles_skips_incomplete() {
        let body = r#"{
            "instrument": "XAU_USD",
            "granularity": "M5",
            "candles": [
                {"complete": true, "volume": 412, "time": "2025-03-04T10:00:00.000000000Z",
                 "mid": {"o": "2901.125", "h": "2903.400", "l": "2899.870", "c": "2902.015"}},
                {"complete": false, "volume": 37, "time": "2025-03-04T10:05:00.000000000Z",
                 "mid": {"o": "2902.015", "h": "2902.300", "l": "2901.900", "c": "2902.100"}}
            ]
        }"#;
        let response: CandlesResponse = serde_json::from_str(body).unwrap();
        let bars = parse_candles(response).unwrap();

        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].open, 2901.125);
        assert_eq!(bars[0].close, 2902.015);
        assert_eq!(bars[0].volume, 412);
        assert!(bars[0].complete);
    }

    #[test]
    fn test_bad_price_is_parse_error() {
        let body = r#"{"candles": [{"complete": true, "volume": 1, "time": "2025-03-04T10:00:00Z",
            "mid": {"o": "abc", "h": "1", "l": "1", "c": "1"}}]}"#;
        let response: CandlesResponse = serde_json::from_str(body).unwrap();
        assert!(matches!(parse_candles(response), Err(ProviderError::Parse(_))));
    }

    #[test]
    fn test_instrument_map_and_count() {
        assert_eq!(instrument_for("XAUUSD"), Some("XAU_USD"));
        assert_eq!(instrument_for("BTCUSD"), Some("BTC_USD"));
        assert_eq!(instrument_for("WTI"), None);

        assert_eq!(count_for(Lookback::Bars(120), Interval::FiveMinutes), 120);
        assert_eq!(count_for(Lookback::Days(1), Interval::FiveMinutes), 288);
        assert_eq!(count_for(Lookback::Days(30), Interval::OneMinute), MAX_COUNT);
    }

    #[test]
    fn test_missing_key_rejected() {
        let err = OandaProvider::new("", "practice", Duration::from_secs(5)).err().unwrap();
        assert!(matches!(err, ProviderError::MissingCredentials("OANDA_API_KEY")));
    }
}
