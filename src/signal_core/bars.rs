//! Bar types for the signal core

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

fn default_complete() -> bool {
    true
}

/// One OHLCV sample from a market data provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    /// False while the bar's interval is still in progress
    #[serde(default = "default_complete")]
    pub complete: bool,
}

impl Bar {
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// Exchange-local trading date of this bar
    pub fn session_date(&self, tz: Tz) -> NaiveDate {
        self.timestamp.with_timezone(&tz).date_naive()
    }
}

/// Slice a chronologically ordered series down to its latest trading session.
///
/// VWAP is cumulative from the session open, so bars from earlier dates
/// must not leak into it.
pub fn latest_session(bars: &[Bar], tz: Tz) -> &[Bar] {
    let Some(last) = bars.last() else {
        return bars;
    };
    let date = last.session_date(tz);
    let start = bars
        .iter()
        .position(|b| b.session_date(tz) == date)
        .unwrap_or(0);
    &bars[start..]
}
