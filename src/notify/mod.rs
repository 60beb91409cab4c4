// src/notify/mod.rs
pub mod telegram;

use async_trait::async_trait;
use tracing::info;

/// Consumer of lifecycle events. Delivery is best-effort: an
/// implementation must log its own failures and never let them reach
/// the trading loop.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, kind: &str, message: &str);
}

/// Fallback sink when no Telegram channel is configured: events only
/// go to the log.
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn notify(&self, kind: &str, message: &str) {
        info!(kind, "{message}");
    }
}
