//! Entry confirmation engines
//!
//! Two strategies decide whether a fresh entry is confirmed:
//! - Pullback: price hugging a trending VWAP, a countertrend candle followed
//!   by a resumption candle, both respecting VWAP. Index and stocks only.
//! - Rejection/Momentum: a wick that pierces VWAP and closes back on the
//!   trend side, or a sustained run of closes on one side of VWAP at a
//!   moderate distance. Primary engine for commodities, fallback elsewhere.
//!
//! Engines run in a fixed priority order and the first confirmation wins.
//! They are only consulted for symbols without an open position.

use serde::{Deserialize, Serialize};

use super::context::SignalContext;
use super::vwap::VwapBar;
use crate::types::{Market, Side};

/// Thresholds shared by the engines and the non-entry classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineThresholds {
    /// Pullback entries need |distance| strictly below this (percent)
    pub pullback_max_distance_pct: f64,
    /// Minimum volume ratio for a pullback entry
    pub pullback_min_volume_ratio: f64,
    /// Minimum series length before the pullback engine is trusted
    pub pullback_min_bars: usize,
    /// Momentum band lower bound on |distance| (percent, inclusive)
    pub momentum_min_distance_pct: f64,
    /// Momentum band upper bound on |distance| (percent, inclusive)
    pub momentum_max_distance_pct: f64,
    /// Minimum volume ratio for momentum entries outside commodities
    pub momentum_min_volume_ratio: f64,
    /// Closed bars that must all hold the VWAP side (commodities)
    pub momentum_bars_commodities: usize,
    /// Closed bars that must all hold the VWAP side (index and stocks)
    pub momentum_bars_default: usize,
    /// |distance| above this is too far from VWAP to chase (percent)
    pub extended_distance_pct: f64,
    /// A directional bias within this distance is a watchlist setup (percent)
    pub setup_distance_pct: f64,
    /// Held positions below this volume ratio are losing momentum
    pub fading_volume_ratio: f64,
}

impl Default for EngineThresholds {
    fn default() -> Self {
        Self {
            pullback_max_distance_pct: 0.15,
            pullback_min_volume_ratio: 1.2,
            pullback_min_bars: 25,
            momentum_min_distance_pct: 0.30,
            momentum_max_distance_pct: 0.80,
            momentum_min_volume_ratio: 1.3,
            momentum_bars_commodities: 3,
            momentum_bars_default: 6,
            extended_distance_pct: 0.8,
            setup_distance_pct: 0.30,
            fading_volume_ratio: 0.7,
        }
    }
}

/// Identity of the engine that opened a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineKind {
    Vwap,
    Momentum,
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineKind::Vwap => write!(f, "VWAP"),
            EngineKind::Momentum => write!(f, "MOMENTUM"),
        }
    }
}

/// The specific rule that produced a confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trigger {
    Pullback,
    Rejection,
    Momentum,
}

impl Trigger {
    pub fn engine(&self) -> EngineKind {
        match self {
            Trigger::Pullback => EngineKind::Vwap,
            Trigger::Rejection | Trigger::Momentum => EngineKind::Momentum,
        }
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trigger::Pullback => write!(f, "VWAP Pullback"),
            Trigger::Rejection => write!(f, "VWAP Rejection"),
            Trigger::Momentum => write!(f, "Momentum"),
        }
    }
}

/// A confirmed fresh entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmation {
    pub side: Side,
    pub trigger: Trigger,
}

/// Closed set of confirmation strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationEngine {
    Pullback,
    RejectionMomentum,
}

const EQUITY_ENGINES: [ConfirmationEngine; 2] =
    [ConfirmationEngine::Pullback, ConfirmationEngine::RejectionMomentum];
const COMMODITY_ENGINES: [ConfirmationEngine; 1] = [ConfirmationEngine::RejectionMomentum];

impl ConfirmationEngine {
    /// Engines for a market, in evaluation priority order
    pub fn for_market(market: Market) -> &'static [ConfirmationEngine] {
        if market.is_commodity() {
            &COMMODITY_ENGINES
        } else {
            &EQUITY_ENGINES
        }
    }

    /// Run this engine against the newest evaluation
    pub fn decide(
        &self,
        series: &[VwapBar],
        ctx: &SignalContext,
        market: Market,
        th: &EngineThresholds,
    ) -> Option<Confirmation> {
        match self {
            ConfirmationEngine::Pullback => pullback(series, ctx, th),
            ConfirmationEngine::RejectionMomentum => {
                rejection(series, ctx).or_else(|| momentum(series, ctx, market, th))
            }
        }
    }
}

/// Evaluate the market's engines in priority order, first match wins
pub fn confirm_entry(
    series: &[VwapBar],
    ctx: &SignalContext,
    market: Market,
    th: &EngineThresholds,
) -> Option<Confirmation> {
    ConfirmationEngine::for_market(market)
        .iter()
        .find_map(|engine| engine.decide(series, ctx, market, th))
}

/// `back = 0` is the newest closed bar, one before the (possibly forming) last bar
fn closed_bar(series: &[VwapBar], back: usize) -> Option<&VwapBar> {
    series.len().checked_sub(2 + back).map(|i| &series[i])
}

fn pullback(series: &[VwapBar], ctx: &SignalContext, th: &EngineThresholds) -> Option<Confirmation> {
    if series.len() < th.pullback_min_bars {
        return None;
    }
    if ctx.distance_pct.abs() >= th.pullback_max_distance_pct {
        return None;
    }
    if ctx.volume_ratio < th.pullback_min_volume_ratio {
        return None;
    }
    let side = ctx.bias.side()?;

    let pullback_candle = closed_bar(series, 1)?;
    let confirm_candle = closed_bar(series, 0)?;

    let confirmed = match side {
        Side::Long => {
            pullback_candle.is_down()
                && confirm_candle.is_up()
                && pullback_candle.close > pullback_candle.vwap
                && confirm_candle.close > confirm_candle.vwap
        }
        Side::Short => {
            pullback_candle.is_up()
                && confirm_candle.is_down()
                && pullback_candle.close < pullback_candle.vwap
                && confirm_candle.close < confirm_candle.vwap
        }
    };

    confirmed.then_some(Confirmation {
        side,
        trigger: Trigger::Pullback,
    })
}

fn rejection(series: &[VwapBar], ctx: &SignalContext) -> Option<Confirmation> {
    let side = ctx.bias.side()?;
    let bar = closed_bar(series, 0)?;
    if !bar.vwap.is_finite() {
        return None;
    }

    let rejected = match side {
        Side::Long => bar.low < bar.vwap && bar.close > bar.vwap && bar.lower_wick() > bar.body(),
        Side::Short => bar.high > bar.vwap && bar.close < bar.vwap && bar.upper_wick() > bar.body(),
    };

    rejected.then_some(Confirmation {
        side,
        trigger: Trigger::Rejection,
    })
}

fn momentum(
    series: &[VwapBar],
    ctx: &SignalContext,
    market: Market,
    th: &EngineThresholds,
) -> Option<Confirmation> {
    let side = ctx.bias.side()?;

    let distance = ctx.distance_pct.abs();
    if distance < th.momentum_min_distance_pct || distance > th.momentum_max_distance_pct {
        return None;
    }
    if !market.is_commodity() && ctx.volume_ratio < th.momentum_min_volume_ratio {
        return None;
    }

    let needed = if market.is_commodity() {
        th.momentum_bars_commodities
    } else {
        th.momentum_bars_default
    };
    let closed_len = series.len().checked_sub(1)?;
    if needed == 0 || closed_len < needed {
        return None;
    }

    let sustained = series[closed_len - needed..closed_len].iter().all(|b| match side {
        Side::Long => b.close > b.vwap,
        Side::Short => b.close < b.vwap,
    });

    sustained.then_some(Confirmation {
        side,
        trigger: Trigger::Momentum,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal_core::context::Bias;

    fn candle(open: f64, close: f64, vwap: f64) -> VwapBar {
        VwapBar {
            open,
            high: open.max(close) + 0.01,
            low: open.min(close) - 0.01,
            close,
            volume: 1000,
            complete: true,
            vwap,
        }
    }

    fn ctx(distance_pct: f64, volume_ratio: f64, bias: Bias) -> SignalContext {
        SignalContext {
            price: 100.0,
            vwap: 100.0,
            distance_pct,
            vwap_slope: 0.1,
            volume_ratio,
            bias,
            live: true,
        }
    }

    /// 25 filler bars above VWAP, then pullback (-3) and confirmation (-2)
    fn bullish_pullback_series() -> Vec<VwapBar> {
        let mut series: Vec<VwapBar> = (0..22).map(|_| candle(100.0, 100.1, 99.9)).collect();
        series.push(candle(100.2, 100.1, 99.95)); // down candle above VWAP
        series.push(candle(100.1, 100.2, 99.96)); // up candle above VWAP
        series.push(candle(100.2, 100.1, 100.0)); // forming
        series
    }

    #[test]
    fn test_pullback_confirms_long() {
        let series = bullish_pullback_series();
        let th = EngineThresholds::default();
        let result = ConfirmationEngine::Pullback.decide(&series, &ctx(0.1, 1.5, Bias::Bullish), Market::Index, &th);
        assert_eq!(
            result,
            Some(Confirmation {
                side: Side::Long,
                trigger: Trigger::Pullback
            })
        );
    }

    #[test]
    fn test_pullback_gates() {
        let series = bullish_pullback_series();
        let th = EngineThresholds::default();
        let engine = ConfirmationEngine::Pullback;

        // Too far from VWAP
        assert!(engine.decide(&series, &ctx(0.15, 1.5, Bias::Bullish), Market::Index, &th).is_none());
        // Thin volume
        assert!(engine.decide(&series, &ctx(0.1, 1.19, Bias::Bullish), Market::Index, &th).is_none());
        // No direction
        assert!(engine.decide(&series, &ctx(0.1, 1.5, Bias::Neutral), Market::Index, &th).is_none());
        // Pattern is bullish, bias is bearish
        assert!(engine.decide(&series, &ctx(-0.1, 1.5, Bias::Bearish), Market::Index, &th).is_none());
        // Too few bars
        assert!(engine.decide(&series[2..], &ctx(0.1, 1.5, Bias::Bullish), Market::Index, &th).is_none());
    }

    #[test]
    fn test_pullback_confirms_short() {
        let mut series: Vec<VwapBar> = (0..22).map(|_| candle(100.0, 99.9, 100.1)).collect();
        series.push(candle(99.8, 99.9, 100.05)); // up candle below VWAP
        series.push(candle(99.9, 99.8, 100.04)); // down candle below VWAP
        series.push(candle(99.8, 99.9, 100.0));

        let result = ConfirmationEngine::Pullback.decide(
            &series,
            &ctx(-0.1, 1.4, Bias::Bearish),
            Market::Stocks,
            &EngineThresholds::default(),
        );
        assert_eq!(result.map(|c| c.side), Some(Side::Short));
    }

    #[test]
    fn test_wick_rejection_long() {
        let mut series: Vec<VwapBar> = (0..10).map(|_| candle(100.0, 100.1, 99.9)).collect();
        // Low pierces VWAP, close recovers, lower wick 0.5 > body 0.05
        series.push(VwapBar {
            open: 100.05,
            high: 100.12,
            low: 99.55,
            close: 100.1,
            volume: 1000,
            complete: true,
            vwap: 99.9,
        });
        series.push(candle(100.1, 100.15, 99.92));

        let result = confirm_entry(&series, &ctx(0.2, 0.5, Bias::Bullish), Market::Commodities, &EngineThresholds::default());
        assert_eq!(
            result,
            Some(Confirmation {
                side: Side::Long,
                trigger: Trigger::Rejection
            })
        );
    }

    #[test]
    fn test_wick_rejection_short_needs_long_upper_wick() {
        let mut series: Vec<VwapBar> = (0..10).map(|_| candle(100.0, 99.9, 100.1)).collect();
        // High pierces VWAP but the wick is shorter than the body
        series.push(VwapBar {
            open: 100.0,
            high: 100.15,
            low: 99.6,
            close: 99.65,
            volume: 1000,
            complete: true,
            vwap: 100.1,
        });
        series.push(candle(99.7, 99.6, 100.08));

        let th = EngineThresholds::default();
        let c = ctx(-0.2, 0.5, Bias::Bearish);
        assert!(rejection(&series, &c).is_none());

        let last_closed = series.len() - 2;
        series[last_closed].high = 100.6;
        assert_eq!(
            confirm_entry(&series, &c, Market::Commodities, &th).map(|c| c.trigger),
            Some(Trigger::Rejection)
        );
    }

    #[test]
    fn test_momentum_window_per_market() {
        let th = EngineThresholds::default();
        // Only the last three closed bars sit above VWAP
        let mut series: Vec<VwapBar> = (0..20).map(|_| candle(100.0, 99.9, 100.0)).collect();
        for _ in 0..3 {
            series.push(candle(100.3, 100.4, 100.0));
        }
        series.push(candle(100.4, 100.5, 100.0));

        let c = ctx(0.5, 1.5, Bias::Bullish);
        assert_eq!(
            momentum(&series, &c, Market::Commodities, &th).map(|c| c.trigger),
            Some(Trigger::Momentum)
        );
        // Six-bar window for equities fails
        assert!(momentum(&series, &c, Market::Stocks, &th).is_none());
    }

    #[test]
    fn test_momentum_band_and_volume() {
        let th = EngineThresholds::default();
        let series: Vec<VwapBar> = (0..30).map(|_| candle(100.3, 100.4, 100.0)).collect();

        assert!(momentum(&series, &ctx(0.30, 1.3, Bias::Bullish), Market::Index, &th).is_some());
        assert!(momentum(&series, &ctx(0.80, 1.3, Bias::Bullish), Market::Index, &th).is_some());
        assert!(momentum(&series, &ctx(0.29, 1.3, Bias::Bullish), Market::Index, &th).is_none());
        assert!(momentum(&series, &ctx(0.81, 1.3, Bias::Bullish), Market::Index, &th).is_none());
        // Volume gate applies outside commodities only
        assert!(momentum(&series, &ctx(0.5, 1.29, Bias::Bullish), Market::Index, &th).is_none());
        assert!(momentum(&series, &ctx(0.5, 0.2, Bias::Bullish), Market::Commodities, &th).is_some());
    }

    #[test]
    fn test_engine_priority() {
        assert_eq!(
            ConfirmationEngine::for_market(Market::Index),
            &[ConfirmationEngine::Pullback, ConfirmationEngine::RejectionMomentum]
        );
        assert_eq!(
            ConfirmationEngine::for_market(Market::Commodities),
            &[ConfirmationEngine::RejectionMomentum]
        );
        assert_eq!(Trigger::Pullback.engine(), EngineKind::Vwap);
        assert_eq!(Trigger::Rejection.engine(), EngineKind::Momentum);
    }
}
