//! Cross-cycle alert layer
//!
//! Remembers the last confirmed side per symbol and which (symbol, kind)
//! alerts have already gone out. Each logical alert fires at most once for
//! the lifetime of the book. Neither map is pruned; `clear` is the only way
//! to shrink them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use super::scanner::ScanResult;
use crate::types::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertKind {
    VwapLostLong,
    VwapLostShort,
    OppositeConfirmed,
    Extended,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::VwapLostLong => "VWAP_LOST_LONG",
            AlertKind::VwapLostShort => "VWAP_LOST_SHORT",
            AlertKind::OppositeConfirmed => "OPPOSITE_CONFIRMED",
            AlertKind::Extended => "EXTENDED",
        }
    }

    fn message(&self, symbol: &str) -> String {
        match self {
            AlertKind::VwapLostLong | AlertKind::VwapLostShort => {
                format!("⚠️ {} | VWAP LOST AFTER CONFIRMATION", symbol)
            }
            AlertKind::OppositeConfirmed => format!("🛑 {} | OPPOSITE CONFIRMED | Bias Flip", symbol),
            AlertKind::Extended => format!("📈 {} | EXTENDED FROM VWAP | Protect Profits", symbol),
        }
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEvent {
    pub id: Uuid,
    pub symbol: String,
    pub kind: AlertKind,
    pub message: String,
    pub raised_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct AlertBook {
    last_confirmed: HashMap<String, Side>,
    notified: HashSet<(String, AlertKind)>,
    /// |distance| (percent) past which a confirmed symbol is flagged extended
    extension_pct: f64,
}

impl AlertBook {
    pub fn new(extension_pct: f64) -> Self {
        Self {
            last_confirmed: HashMap::new(),
            notified: HashSet::new(),
            extension_pct,
        }
    }

    pub fn last_confirmed(&self, symbol: &str) -> Option<Side> {
        self.last_confirmed.get(symbol).copied()
    }

    pub fn notified_count(&self) -> usize {
        self.notified.len()
    }

    /// Forget every snapshot and every sent alert
    pub fn clear(&mut self) {
        self.last_confirmed.clear();
        self.notified.clear();
    }

    /// Diff one cycle's batch against retained state and return new alerts
    pub fn process(&mut self, results: &[ScanResult]) -> Vec<AlertEvent> {
        let mut events = Vec::new();

        for result in results {
            let prev = self.last_confirmed(&result.symbol);
            let current = result.state.confirmed_side();

            if let Some(side) = current {
                self.last_confirmed.insert(result.symbol.clone(), side);
            }

            let Some(prev) = prev else {
                continue;
            };

            if prev == Side::Long && result.price < result.vwap {
                self.raise(&result.symbol, AlertKind::VwapLostLong, &mut events);
            }
            if prev == Side::Short && result.price > result.vwap {
                self.raise(&result.symbol, AlertKind::VwapLostShort, &mut events);
            }
            if current == Some(prev.opposite()) {
                self.raise(&result.symbol, AlertKind::OppositeConfirmed, &mut events);
            }
            if result.distance_pct.abs() > self.extension_pct {
                self.raise(&result.symbol, AlertKind::Extended, &mut events);
            }
        }

        events
    }

    fn raise(&mut self, symbol: &str, kind: AlertKind, events: &mut Vec<AlertEvent>) {
        if !self.notified.insert((symbol.to_string(), kind)) {
            return;
        }
        events.push(AlertEvent {
            id: Uuid::new_v4(),
            symbol: symbol.to_string(),
            kind,
            message: kind.message(symbol),
            raised_at: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal_core::context::Bias;
    use crate::signal_core::engines::Trigger;
    use crate::signal_core::scanner::{Health, TradeState};
    use crate::types::Market;

    fn row(symbol: &str, state: TradeState, price: f64, vwap: f64) -> ScanResult {
        ScanResult {
            symbol: symbol.to_string(),
            market: Market::Index,
            state,
            bias: Bias::Neutral,
            price,
            vwap,
            distance_pct: (price - vwap) / vwap * 100.0,
            volume_ratio: 1.0,
            option_bias: None,
            live: false,
        }
    }

    fn entered(side: Side) -> TradeState {
        TradeState::Entered {
            side,
            trigger: Trigger::Pullback,
        }
    }

    #[test]
    fn test_no_alert_without_prior_confirmation() {
        let mut book = AlertBook::new(0.6);
        let events = book.process(&[row("^NSEI", TradeState::Wait, 99.0, 100.0)]);
        assert!(events.is_empty());

        // First confirmation only records the snapshot
        let events = book.process(&[row("^NSEI", entered(Side::Long), 100.1, 100.0)]);
        assert!(events.is_empty());
        assert_eq!(book.last_confirmed("^NSEI"), Some(Side::Long));
    }

    #[test]
    fn test_vwap_lost_fires_once_across_cycles() {
        let mut book = AlertBook::new(0.6);
        book.process(&[row("^NSEI", entered(Side::Long), 100.1, 100.0)]);

        let exited = row("^NSEI", TradeState::Exited { side: Side::Long }, 99.9, 100.0);
        let mut total = 0;
        for _ in 0..3 {
            let events = book.process(&[exited.clone()]);
            total += events.len();
            if let Some(e) = events.first() {
                assert_eq!(e.kind, AlertKind::VwapLostLong);
                assert_eq!(e.message, "⚠️ ^NSEI | VWAP LOST AFTER CONFIRMATION");
            }
        }
        assert_eq!(total, 1);
    }

    #[test]
    fn test_vwap_lost_short() {
        let mut book = AlertBook::new(0.6);
        book.process(&[row("XAUUSD", entered(Side::Short), 2349.0, 2350.0)]);
        let events = book.process(&[row("XAUUSD", TradeState::Wait, 2350.5, 2350.0)]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, AlertKind::VwapLostShort);
    }

    #[test]
    fn test_opposite_confirmation_updates_snapshot() {
        let mut book = AlertBook::new(0.6);
        book.process(&[row("^NSEBANK", entered(Side::Long), 100.1, 100.0)]);

        let events = book.process(&[row("^NSEBANK", entered(Side::Short), 99.95, 100.0)]);
        let kinds: Vec<AlertKind> = events.iter().map(|e| e.kind).collect();
        assert!(kinds.contains(&AlertKind::OppositeConfirmed));
        assert!(kinds.contains(&AlertKind::VwapLostLong));
        assert_eq!(book.last_confirmed("^NSEBANK"), Some(Side::Short));

        // Same-side re-confirmation is not a flip
        let events = book.process(&[row("^NSEBANK", entered(Side::Short), 99.95, 100.0)]);
        assert!(events.iter().all(|e| e.kind != AlertKind::OppositeConfirmed));
    }

    #[test]
    fn test_extension_warning() {
        let mut book = AlertBook::new(0.6);
        book.process(&[row("RELIANCE.NS", entered(Side::Long), 100.1, 100.0)]);

        let held = TradeState::Holding {
            side: Side::Long,
            health: Health::Healthy,
        };
        assert!(book.process(&[row("RELIANCE.NS", held, 100.5, 100.0)]).is_empty());

        let events = book.process(&[row("RELIANCE.NS", held, 100.7, 100.0)]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, AlertKind::Extended);
        assert_eq!(book.notified_count(), 1);
    }

    #[test]
    fn test_clear_resets_dedup() {
        let mut book = AlertBook::new(0.6);
        book.process(&[row("^NSEI", entered(Side::Long), 100.1, 100.0)]);
        assert_eq!(book.process(&[row("^NSEI", TradeState::Wait, 99.0, 100.0)]).len(), 2);

        book.clear();
        assert!(book.last_confirmed("^NSEI").is_none());
        assert!(book.process(&[row("^NSEI", TradeState::Wait, 99.0, 100.0)]).is_empty());
    }
}
