// Telegram notifier — Bot API sendMessage over HTTPS.
//
// Messages arrive pre-rendered and pre-escaped (parse_mode=HTML). A non-ok
// response body is surfaced as an error so the dispatcher can skip the
// delivery record.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::Notifier;

pub struct TelegramNotifier {
    client: reqwest::Client,
    api_base: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("kestrel/0.1 (account watcher)")
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_base: format!("https://api.telegram.org/bot{bot_token}"),
        })
    }
}

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    description: Option<String>,
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, channel_id: i64, message: &str) -> Result<()> {
        let url = format!("{}/sendMessage", self.api_base);

        let response = self
            .client
            .post(&url)
            .json(&json!({
                "chat_id": channel_id,
                "text": message,
                "parse_mode": "HTML",
                "disable_web_page_preview": false,
            }))
            .send()
            .await
            .context("Telegram sendMessage request failed")?;

        let status = response.status();
        let body: ApiResponse = response
            .json()
            .await
            .with_context(|| format!("Telegram returned unparseable response ({status})"))?;

        if !body.ok {
            anyhow::bail!(
                "Telegram sendMessage failed for chat {channel_id}: {}",
                body.description.unwrap_or_else(|| status.to_string())
            );
        }

        debug!(chat_id = channel_id, "Telegram alert sent");
        Ok(())
    }
}
