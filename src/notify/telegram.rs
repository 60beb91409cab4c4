// src/notify/telegram.rs
use crate::notify::NotificationSink;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::warn;

const SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Pushes events to a Telegram chat through the Bot API. Token and
/// chat id are injected from configuration, never baked in.
pub struct TelegramSink {
    bot_token: String,
    chat_id: String,
    client: Client,
}

impl TelegramSink {
    pub fn new(bot_token: String, chat_id: String) -> Self {
        let client = Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            bot_token,
            chat_id,
            client,
        }
    }

    async fn send(&self, text: &str) -> Result<(), reqwest::Error> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        self.client
            .post(&url)
            .json(&serde_json::json!({
                "chat_id": self.chat_id,
                "text": text,
            }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for TelegramSink {
    async fn notify(&self, kind: &str, message: &str) {
        if let Err(e) = self.send(message).await {
            // Best-effort by contract: the trading loop never sees
            // notification failures.
            warn!(kind, error = %e, "telegram delivery failed");
        }
    }
}
