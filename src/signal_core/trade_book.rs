//! Trade book: open logical positions per symbol
//!
//! At most one position per symbol. The book does not lock; the caller owns
//! it and mutates it from one task at a time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::engines::EngineKind;
use crate::types::Side;

/// An open logical position opened by a confirmation engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub side: Side,
    pub engine: EngineKind,
    pub entry_price: Option<f64>,
    pub entry_vwap: Option<f64>,
    pub opened_at: DateTime<Utc>,
}

impl Position {
    pub fn new(side: Side, engine: EngineKind) -> Self {
        Self {
            side,
            engine,
            entry_price: None,
            entry_vwap: None,
            opened_at: Utc::now(),
        }
    }

    pub fn with_entry(mut self, price: f64, vwap: f64) -> Self {
        self.entry_price = Some(price);
        self.entry_vwap = Some(vwap);
        self
    }

    /// Price crossed back through VWAP against the held side
    pub fn vwap_lost(&self, price: f64, vwap: f64) -> bool {
        match self.side {
            Side::Long => price < vwap,
            Side::Short => price > vwap,
        }
    }
}

#[derive(Debug, Default)]
pub struct TradeBook {
    positions: HashMap<String, Position>,
}

impl TradeBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    /// Open a position. Returns false and leaves the book untouched when
    /// the symbol already holds one.
    pub fn open(&mut self, symbol: &str, position: Position) -> bool {
        if self.positions.contains_key(symbol) {
            return false;
        }
        self.positions.insert(symbol.to_string(), position);
        true
    }

    pub fn close(&mut self, symbol: &str) -> Option<Position> {
        self.positions.remove(symbol)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Position)> {
        self.positions.iter()
    }
}
