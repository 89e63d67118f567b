//! Cumulative VWAP annotation
//!
//! VWAP is computed from the first bar of the series, not over a rolling
//! window. A short series gives a noisier line but still a defined one.

use serde::{Deserialize, Serialize};

use super::bars::Bar;
use crate::error::ScanError;

/// A bar annotated with the session VWAP up to and including itself
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VwapBar {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub complete: bool,
    /// NaN while cumulative volume is still zero
    pub vwap: f64,
}

impl VwapBar {
    pub fn is_up(&self) -> bool {
        self.close > self.open
    }

    pub fn is_down(&self) -> bool {
        self.close < self.open
    }

    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    pub fn upper_wick(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    pub fn lower_wick(&self) -> f64 {
        self.open.min(self.close) - self.low
    }
}

/// Annotate every bar with cumulative VWAP.
///
/// `typical = (high + low + close) / 3`, `vwap[i] = Σ typical·volume / Σ volume`
/// over bars `0..=i`. Fails only when the series is shorter than `min_bars`
/// (never shorter than one bar).
pub fn calculate_vwap(bars: &[Bar], min_bars: usize) -> Result<Vec<VwapBar>, ScanError> {
    let need = min_bars.max(1);
    if bars.len() < need {
        return Err(ScanError::InsufficientData {
            have: bars.len(),
            need,
        });
    }

    let mut cum_pv = 0.0;
    let mut cum_vol = 0u64;

    let annotated = bars
        .iter()
        .map(|bar| {
            cum_pv += bar.typical_price() * bar.volume as f64;
            cum_vol += bar.volume;

            let vwap = if cum_vol == 0 {
                f64::NAN
            } else {
                cum_pv / cum_vol as f64
            };

            VwapBar {
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
                volume: bar.volume,
                complete: bar.complete,
                vwap,
            }
        })
        .collect();

    Ok(annotated)
}
