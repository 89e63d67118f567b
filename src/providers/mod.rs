//! Market data providers
//!
//! [`MarketDataProvider`] is the only contract the scan cycle needs from a
//! data vendor: chronologically ordered bars for one symbol, with the
//! in-progress bar marked `complete = false`.
//!
//! - [`yahoo`] - Yahoo Finance chart API (index and stock universes)
//! - [`oanda`] - OANDA v20 candles (commodity universe)

pub mod errors;
pub mod oanda;
pub mod yahoo;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::signal_core::Bar;

pub use errors::ProviderError;
pub use oanda::OandaProvider;
pub use yahoo::YahooProvider;

/// Bar interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interval {
    OneMinute,
    FiveMinutes,
    FifteenMinutes,
}

impl Interval {
    pub fn duration(&self) -> Duration {
        match self {
            Interval::OneMinute => Duration::from_secs(60),
            Interval::FiveMinutes => Duration::from_secs(5 * 60),
            Interval::FifteenMinutes => Duration::from_secs(15 * 60),
        }
    }

    /// Bars per 24 hours, used to turn a day lookback into a bar count
    pub fn bars_per_day(&self) -> u32 {
        (24 * 60 * 60 / self.duration().as_secs()) as u32
    }
}

/// How much history to request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lookback {
    /// Whole trading days, today included
    Days(u32),
    /// The most recent N bars
    Bars(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub symbol: String,
    pub interval: Interval,
    pub lookback: Lookback,
}

impl FetchRequest {
    pub fn new(symbol: &str, interval: Interval, lookback: Lookback) -> Self {
        Self {
            symbol: symbol.to_string(),
            interval,
            lookback,
        }
    }
}

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetch bars for one symbol. An empty vector means no data, not an error.
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Bar>, ProviderError>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}
