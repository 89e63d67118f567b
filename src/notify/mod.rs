//! Notification channels for alert events
//!
//! Delivery is best-effort. The runner dispatches each message on its own
//! task and only logs failures; nothing here can fail a scan cycle.

pub mod telegram;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

pub use telegram::TelegramNotifier;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("notification request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("notification rejected: {0}")]
    Api(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str) -> Result<(), NotificationError>;
}

/// Channel that only writes alerts to the log
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, message: &str) -> Result<(), NotificationError> {
        info!("ALERT {}", message);
        Ok(())
    }
}
