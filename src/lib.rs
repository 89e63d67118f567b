// Library crate - signal engine, data providers and scan cycle runner

pub mod types;
pub mod config;
pub mod error;
pub mod signal_core;
pub mod providers;
pub mod notify;
pub mod runner;
pub mod report;

// Re-export commonly used types
pub use types::*;
pub use config::{ScreenerConfig, Universe};
pub use error::ScanError;
pub use runner::{CycleReport, Screener};
