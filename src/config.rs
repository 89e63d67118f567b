//! Screener configuration

use chrono_tz::Tz;
use std::time::Duration;

use crate::providers::Interval;
use crate::signal_core::{EngineThresholds, OptionBiasConfig, RelativeVolumeConfig, VolumeWindows};
use crate::types::Market;

const INDEX: &[&str] = &["^NSEI", "^NSEBANK"];

const NIFTY_50: &[&str] = &[
    "ADANIENT.NS", "ADANIPORTS.NS", "APOLLOHOSP.NS", "ASIANPAINT.NS", "AXISBANK.NS",
    "BAJAJ-AUTO.NS", "BAJFINANCE.NS", "BAJAJFINSV.NS", "BEL.NS", "BHARTIARTL.NS",
    "CIPLA.NS", "COALINDIA.NS", "DRREDDY.NS", "EICHERMOT.NS", "ETERNAL.NS",
    "GRASIM.NS", "HCLTECH.NS", "HDFCBANK.NS", "HDFCLIFE.NS", "HEROMOTOCO.NS",
    "HINDALCO.NS", "HINDUNILVR.NS", "ICICIBANK.NS", "INDUSINDBK.NS", "INFY.NS",
    "ITC.NS", "JIOFIN.NS", "JSWSTEEL.NS", "KOTAKBANK.NS", "LT.NS",
    "M&M.NS", "MARUTI.NS", "NESTLEIND.NS", "NTPC.NS", "ONGC.NS",
    "POWERGRID.NS", "RELIANCE.NS", "SBILIFE.NS", "SBIN.NS", "SHRIRAMFIN.NS",
    "SUNPHARMA.NS", "TATACONSUM.NS", "TATAMOTORS.NS", "TATASTEEL.NS", "TCS.NS",
    "TECHM.NS", "TITAN.NS", "TRENT.NS", "ULTRACEMCO.NS", "WIPRO.NS",
];

const COMMODITIES: &[&str] = &["XAUUSD", "BTCUSD"];

/// Three named instrument lists selected by the market toggle
#[derive(Debug, Clone)]
pub struct Universe {
    pub index: Vec<String>,
    pub stocks: Vec<String>,
    pub commodities: Vec<String>,
}

impl Default for Universe {
    fn default() -> Self {
        let owned = |list: &[&str]| list.iter().map(|s| s.to_string()).collect();
        Self {
            index: owned(INDEX),
            stocks: owned(NIFTY_50),
            commodities: owned(COMMODITIES),
        }
    }
}

impl Universe {
    pub fn symbols(&self, market: Market) -> &[String] {
        match market {
            Market::Index => &self.index,
            Market::Stocks => &self.stocks,
            Market::Commodities => &self.commodities,
        }
    }

    /// Replace one market's list, e.g. from a CLI override
    pub fn set_symbols(&mut self, market: Market, symbols: Vec<String>) {
        match market {
            Market::Index => self.index = symbols,
            Market::Stocks => self.stocks = symbols,
            Market::Commodities => self.commodities = symbols,
        }
    }
}

/// Full configuration for the scan cycle
#[derive(Debug, Clone)]
pub struct ScreenerConfig {
    /// Engine and classification thresholds
    pub thresholds: EngineThresholds,
    /// Strike steps and near-the-money distance
    pub option_bias: OptionBiasConfig,
    /// Stocks-only relative volume pre-filter
    pub relative_volume: RelativeVolumeConfig,
    /// Volume ratio windows for index and stocks
    pub equity_volume_windows: VolumeWindows,
    /// Volume ratio windows for commodities (one hour of 5m bars as baseline)
    pub commodity_volume_windows: VolumeWindows,
    /// Instruments with fewer bars are skipped for the cycle
    pub min_bars: usize,
    /// |distance| (percent) past which a confirmed symbol raises EXTENDED
    pub alert_extension_pct: f64,
    /// Instrument lists
    pub universe: Universe,
    /// Exchange time zone for session slicing of index and stocks
    pub exchange_tz: Tz,
    /// Bar interval requested from providers
    pub interval: Interval,
    /// Bars requested per commodity fetch
    pub commodity_bar_count: u32,
    /// Bound on a single instrument fetch
    pub fetch_timeout: Duration,
    /// Concurrent fetches per cycle
    pub concurrency: usize,
    /// Delay between cycles in watch mode
    pub refresh_interval: Duration,
    /// Clear alert state when the exchange date rolls over
    pub reset_alerts_on_new_session: bool,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            thresholds: EngineThresholds::default(),
            option_bias: OptionBiasConfig::default(),
            relative_volume: RelativeVolumeConfig::default(),
            equity_volume_windows: VolumeWindows::default(),
            commodity_volume_windows: VolumeWindows {
                recent: 2,
                baseline: 12,
            },
            min_bars: 25,
            alert_extension_pct: 0.6,
            universe: Universe::default(),
            exchange_tz: chrono_tz::Asia::Kolkata,
            interval: Interval::FiveMinutes,
            commodity_bar_count: 120,
            fetch_timeout: Duration::from_secs(10),
            concurrency: 8,
            refresh_interval: Duration::from_secs(60),
            reset_alerts_on_new_session: false,
        }
    }
}

impl ScreenerConfig {
    pub fn volume_windows(&self, market: Market) -> VolumeWindows {
        if market.is_commodity() {
            self.commodity_volume_windows
        } else {
            self.equity_volume_windows
        }
    }
}
