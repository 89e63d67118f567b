//! Option contract suggestion for confirmed index and stock entries

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::context::Bias;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionBiasConfig {
    /// Strike granularity per symbol
    pub strike_steps: HashMap<String, f64>,
    /// Step for symbols without an explicit entry (single stocks)
    pub default_step: f64,
    /// Below this |distance| (percent) the suggestion goes one strike in the money
    pub near_money_pct: f64,
}

impl Default for OptionBiasConfig {
    fn default() -> Self {
        let strike_steps = [("^NSEI", 50.0), ("^NSEBANK", 100.0), ("^BANKNIFTY", 100.0)]
            .into_iter()
            .map(|(s, step)| (s.to_string(), step))
            .collect();

        Self {
            strike_steps,
            default_step: 10.0,
            near_money_pct: 0.15,
        }
    }
}

impl OptionBiasConfig {
    pub fn step_for(&self, symbol: &str) -> f64 {
        self.strike_steps
            .get(symbol)
            .copied()
            .unwrap_or(self.default_step)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionKind {
    Call,
    Put,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrikeStyle {
    Atm,
    Itm,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionSuggestion {
    pub kind: OptionKind,
    pub strike: f64,
    pub style: StrikeStyle,
}

impl std::fmt::Display for OptionSuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            OptionKind::Call => "CALL",
            OptionKind::Put => "PUT",
        };
        let style = match self.style {
            StrikeStyle::Atm => "ATM",
            StrikeStyle::Itm => "ITM",
        };
        write!(f, "{} {} ({})", kind, self.strike, style)
    }
}

/// Suggest a call or put strike for a directional bias.
///
/// The at-the-money strike is the price rounded to the symbol's step. Close
/// to VWAP the suggestion moves one step in the money.
pub fn suggest_option(
    symbol: &str,
    price: f64,
    bias: Bias,
    distance_pct: f64,
    config: &OptionBiasConfig,
) -> Option<OptionSuggestion> {
    let step = config.step_for(symbol);
    if step <= 0.0 || !price.is_finite() {
        return None;
    }

    let atm = (price / step).round() * step;
    let style = if distance_pct.abs() < config.near_money_pct {
        StrikeStyle::Itm
    } else {
        StrikeStyle::Atm
    };

    let (kind, itm_strike) = match bias {
        Bias::Bullish => (OptionKind::Call, atm - step),
        Bias::Bearish => (OptionKind::Put, atm + step),
        Bias::Neutral => return None,
    };

    let strike = match style {
        StrikeStyle::Atm => atm,
        StrikeStyle::Itm => itm_strike,
    };

    Some(OptionSuggestion { kind, strike, style })
}
