//! Signal Core - VWAP signal and state engine
//!
//! This module contains the decision logic of the screener:
//! - Cumulative VWAP annotation
//! - Signal context (distance, slope, volume ratio, bias)
//! - Entry confirmation engines (pullback, rejection/momentum)
//! - Trade book and held-position management
//! - Per-instrument scan pipeline
//! - Cross-cycle alert deduplication
//! - Option strike suggestion and the stocks relative-volume filter

pub mod bars;
pub mod vwap;
pub mod context;
pub mod engines;
pub mod trade_book;
pub mod scanner;
pub mod alerts;
pub mod option_bias;
pub mod volume_filter;

// Re-export commonly used types
pub use bars::{latest_session, Bar};
pub use vwap::{calculate_vwap, VwapBar};
pub use context::{build_context, Bias, SignalContext, VolumeWindows};
pub use engines::{confirm_entry, Confirmation, ConfirmationEngine, EngineKind, EngineThresholds, Trigger};
pub use trade_book::{Position, TradeBook};
pub use scanner::{scan_symbol, Health, ScanResult, TradeState};
pub use alerts::{AlertBook, AlertEvent, AlertKind};
pub use option_bias::{suggest_option, OptionBiasConfig, OptionSuggestion};
pub use volume_filter::{has_high_relative_volume, RelativeVolumeConfig};
