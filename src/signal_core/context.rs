//! Signal context: where price sits relative to VWAP and where VWAP is heading

use serde::{Deserialize, Serialize};

use super::vwap::VwapBar;
use crate::error::ScanError;
use crate::types::{round2, Side};

/// Bars between the two VWAP samples used for slope
const SLOPE_LOOKBACK: usize = 4;

/// Directional lean derived from price vs VWAP and VWAP slope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bias {
    Bullish,
    Bearish,
    Neutral,
}

impl Bias {
    /// Side a confirmed entry in this direction would take
    pub fn side(&self) -> Option<Side> {
        match self {
            Bias::Bullish => Some(Side::Long),
            Bias::Bearish => Some(Side::Short),
            Bias::Neutral => None,
        }
    }

    pub fn is_directional(&self) -> bool {
        !matches!(self, Bias::Neutral)
    }
}

impl std::fmt::Display for Bias {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Bias::Bullish => write!(f, "Bullish"),
            Bias::Bearish => write!(f, "Bearish"),
            Bias::Neutral => write!(f, "WAIT"),
        }
    }
}

/// Window lengths for the volume ratio, counted in closed bars
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VolumeWindows {
    pub recent: usize,
    pub baseline: usize,
}

impl Default for VolumeWindows {
    fn default() -> Self {
        Self {
            recent: 2,
            baseline: 20,
        }
    }
}

/// Per-evaluation snapshot consumed by the engines and the trade book
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalContext {
    pub price: f64,
    pub vwap: f64,
    pub distance_pct: f64,
    pub vwap_slope: f64,
    /// Rounded to two decimals before any threshold is applied
    pub volume_ratio: f64,
    pub bias: Bias,
    /// True when the newest bar is still forming
    pub live: bool,
}

/// Sign of price-vs-VWAP and sign of slope; any zero is Neutral
pub fn classify_bias(distance_pct: f64, vwap_slope: f64) -> Bias {
    if distance_pct > 0.0 && vwap_slope > 0.0 {
        Bias::Bullish
    } else if distance_pct < 0.0 && vwap_slope < 0.0 {
        Bias::Bearish
    } else {
        Bias::Neutral
    }
}

fn mean_volume(bars: &[VwapBar]) -> f64 {
    if bars.is_empty() {
        return 0.0;
    }
    bars.iter().map(|b| b.volume as f64).sum::<f64>() / bars.len() as f64
}

/// Mean volume of the last `recent` closed bars over the mean of the last
/// `baseline` closed bars. The newest bar is never part of either window.
pub fn volume_ratio(series: &[VwapBar], windows: &VolumeWindows) -> f64 {
    let closed = &series[..series.len().saturating_sub(1)];
    let recent = &closed[closed.len().saturating_sub(windows.recent)..];
    let baseline = &closed[closed.len().saturating_sub(windows.baseline)..];

    let avg = mean_volume(baseline);
    if avg > 0.0 {
        round2(mean_volume(recent) / avg)
    } else {
        0.0
    }
}

/// Build the context for the newest bar of a VWAP-annotated series
pub fn build_context(series: &[VwapBar], windows: &VolumeWindows) -> Result<SignalContext, ScanError> {
    let need = SLOPE_LOOKBACK + 1;
    if series.len() < need {
        return Err(ScanError::InsufficientData {
            have: series.len(),
            need,
        });
    }

    let last = &series[series.len() - 1];
    let price = last.close;
    let vwap = last.vwap;
    if !vwap.is_finite() || vwap == 0.0 {
        return Err(ScanError::UndefinedVwap);
    }

    let distance_pct = (price - vwap) / vwap * 100.0;
    let vwap_slope = vwap - series[series.len() - 1 - SLOPE_LOOKBACK].vwap;

    Ok(SignalContext {
        price,
        vwap,
        distance_pct,
        vwap_slope,
        volume_ratio: volume_ratio(series, windows),
        bias: classify_bias(distance_pct, vwap_slope),
        live: !last.complete,
    })
}
