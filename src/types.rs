use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Market toggle selecting the universe, the data provider and the engine set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum Market {
    Index,
    Stocks,
    Commodities,
}

impl Market {
    /// Option-style bias is only meaningful for exchange-listed derivatives
    pub fn supports_option_bias(&self) -> bool {
        matches!(self, Market::Index | Market::Stocks)
    }

    pub fn is_commodity(&self) -> bool {
        matches!(self, Market::Commodities)
    }
}

impl std::fmt::Display for Market {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Market::Index => write!(f, "Index"),
            Market::Stocks => write!(f, "Stocks"),
            Market::Commodities => write!(f, "Commodities"),
        }
    }
}

/// Side of a logical position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn opposite(&self) -> Side {
        match self {
            Side::Long => Side::Short,
            Side::Short => Side::Long,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Long => write!(f, "LONG"),
            Side::Short => write!(f, "SHORT"),
        }
    }
}

/// Round to two decimals, the precision used for every reported figure
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
