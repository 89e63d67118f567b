//! Per-instrument scan pipeline
//!
//! bars -> VWAP -> context -> trade book lookup -> exit/health for a held
//! position, or extension check -> engines -> watchlist classification for
//! a flat one.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::bars::Bar;
use super::context::{build_context, Bias, SignalContext};
use super::engines::{confirm_entry, EngineThresholds, Trigger};
use super::option_bias::{suggest_option, OptionSuggestion};
use super::trade_book::{Position, TradeBook};
use super::vwap::{calculate_vwap, VwapBar};
use crate::config::ScreenerConfig;
use crate::error::ScanError;
use crate::types::{round2, Market, Side};

/// Advisory label for a held position. Never closes anything by itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Health {
    Healthy,
    MomentumFading,
    Extended,
}

impl std::fmt::Display for Health {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Health::Healthy => write!(f, "HEALTHY"),
            Health::MomentumFading => write!(f, "MOMENTUM FADING"),
            Health::Extended => write!(f, "EXTENDED"),
        }
    }
}

/// Trade state reported for an instrument in one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeState {
    /// An engine confirmed a fresh entry this cycle
    Entered { side: Side, trigger: Trigger },
    /// A position opened in an earlier cycle is still held
    Holding { side: Side, health: Health },
    /// Price crossed back through VWAP; the position was closed
    Exited { side: Side },
    /// Too far from VWAP to chase
    Avoid,
    /// Directional bias close to VWAP, no confirmation yet
    SetupForming { bias: Bias },
    Wait,
}

impl TradeState {
    /// Only a fresh engine confirmation counts as confirmed
    pub fn is_confirmed(&self) -> bool {
        matches!(self, TradeState::Entered { .. })
    }

    pub fn confirmed_side(&self) -> Option<Side> {
        match self {
            TradeState::Entered { side, .. } => Some(*side),
            _ => None,
        }
    }

    /// Fresh or held position
    pub fn is_active(&self) -> bool {
        matches!(self, TradeState::Entered { .. } | TradeState::Holding { .. })
    }

    pub fn is_setup_forming(&self) -> bool {
        matches!(self, TradeState::SetupForming { .. })
    }
}

impl std::fmt::Display for TradeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeState::Entered { side, trigger } => write!(f, "ACTIVE {} ({})", side, trigger),
            TradeState::Holding { side, health } => write!(f, "ACTIVE {} - {}", side, health),
            TradeState::Exited { side } => write!(f, "EXIT {} (VWAP LOST)", side),
            TradeState::Avoid => write!(f, "AVOID (Extended)"),
            TradeState::SetupForming { bias } => write!(f, "{} Setup Forming (WAIT)", bias),
            TradeState::Wait => write!(f, "WAIT"),
        }
    }
}

/// One instrument's row in a cycle's result batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub symbol: String,
    pub market: Market,
    pub state: TradeState,
    pub bias: Bias,
    pub price: f64,
    pub vwap: f64,
    pub distance_pct: f64,
    pub volume_ratio: f64,
    pub option_bias: Option<OptionSuggestion>,
    /// Newest bar was still forming when scanned
    pub live: bool,
}

impl ScanResult {
    fn new(symbol: &str, market: Market, state: TradeState, ctx: &SignalContext) -> Self {
        Self {
            symbol: symbol.to_string(),
            market,
            state,
            bias: ctx.bias,
            price: round2(ctx.price),
            vwap: round2(ctx.vwap),
            distance_pct: round2(ctx.distance_pct),
            volume_ratio: ctx.volume_ratio,
            option_bias: None,
            live: ctx.live,
        }
    }
}

pub fn classify_health(ctx: &SignalContext, th: &EngineThresholds) -> Health {
    if ctx.volume_ratio < th.fading_volume_ratio {
        Health::MomentumFading
    } else if ctx.distance_pct.abs() > th.extended_distance_pct {
        Health::Extended
    } else {
        Health::Healthy
    }
}

/// Decide the state of a symbol with no open position.
///
/// Extension is checked before any engine runs.
pub fn evaluate_entry(
    series: &[VwapBar],
    ctx: &SignalContext,
    market: Market,
    th: &EngineThresholds,
) -> TradeState {
    let distance = ctx.distance_pct.abs();
    if distance > th.extended_distance_pct {
        return TradeState::Avoid;
    }

    if let Some(confirmation) = confirm_entry(series, ctx, market, th) {
        return TradeState::Entered {
            side: confirmation.side,
            trigger: confirmation.trigger,
        };
    }

    if ctx.bias.is_directional() && distance <= th.setup_distance_pct {
        TradeState::SetupForming { bias: ctx.bias }
    } else {
        TradeState::Wait
    }
}

/// Run the full pipeline for one instrument and apply its trade book change.
///
/// A symbol holding a position never reaches the engines: it is either
/// exited on a VWAP loss or labelled with its health.
pub fn scan_symbol(
    symbol: &str,
    market: Market,
    bars: &[Bar],
    book: &mut TradeBook,
    config: &ScreenerConfig,
) -> Result<ScanResult, ScanError> {
    let series = calculate_vwap(bars, config.min_bars)?;
    let ctx = build_context(&series, &config.volume_windows(market))?;
    let th = &config.thresholds;

    if let Some((side, lost)) = book
        .lookup(symbol)
        .map(|p| (p.side, p.vwap_lost(ctx.price, ctx.vwap)))
    {
        let state = if lost {
            book.close(symbol);
            info!("{} exit {} on VWAP loss (price {:.2}, vwap {:.2})", symbol, side, ctx.price, ctx.vwap);
            TradeState::Exited { side }
        } else {
            TradeState::Holding {
                side,
                health: classify_health(&ctx, th),
            }
        };
        return Ok(ScanResult::new(symbol, market, state, &ctx));
    }

    let state = evaluate_entry(&series, &ctx, market, th);
    let mut result = ScanResult::new(symbol, market, state, &ctx);

    if let TradeState::Entered { side, trigger } = state {
        let position = Position::new(side, trigger.engine()).with_entry(ctx.price, ctx.vwap);
        book.open(symbol, position);
        info!(
            "{} confirmed {} via {} (distance {:.2}%, vol ratio {:.2})",
            symbol, side, trigger, ctx.distance_pct, ctx.volume_ratio
        );

        if market.supports_option_bias() {
            result.option_bias = suggest_option(symbol, ctx.price, ctx.bias, ctx.distance_pct, &config.option_bias);
        }
    } else {
        debug!("{} {} (distance {:.2}%)", symbol, state, ctx.distance_pct);
    }

    Ok(result)
}
