use thiserror::Error;

use crate::providers::ProviderError;

/// Reasons an instrument is left out of a cycle's result batch.
///
/// None of these abort a cycle: the runner logs them and moves on to the
/// next instrument.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The series is shorter than the minimum the pipeline needs
    #[error("insufficient data: {have} bars, need at least {need}")]
    InsufficientData { have: usize, need: usize },

    /// Cumulative volume is zero, so there is no VWAP to measure against
    #[error("VWAP undefined (zero cumulative volume)")]
    UndefinedVwap,

    /// The market data provider failed for this instrument
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
}

impl ScanError {
    /// Skips caused by thin data are routine; provider failures deserve a warning
    pub fn is_data_shortfall(&self) -> bool {
        matches!(self, ScanError::InsufficientData { .. } | ScanError::UndefinedVwap)
    }
}
