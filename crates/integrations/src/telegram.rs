//! Telegram bot notifier.

use std::time::Duration;

use liverec_common::config::TelegramConfig;
use liverec_common::error::{LiverecError, LiverecResult};
use liverec_platform_core::Notifier;
use reqwest::Client;
use serde::Serialize;

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

/// Sends HTML-formatted messages to one chat.
pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig) -> LiverecResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| LiverecError::config(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            api_base: DEFAULT_API_BASE.to_string(),
            bot_token: config.bot_token.clone(),
            chat_id: config.chat_id.clone(),
        })
    }

    /// Point at another Bot API server.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.api_base.trim_end_matches('/'),
            self.bot_token
        )
    }
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, message: &str) -> LiverecResult<()> {
        let body = SendMessage {
            chat_id: &self.chat_id,
            text: message,
            parse_mode: "HTML",
        };
        let response = self
            .client
            .post(self.endpoint())
            .json(&body)
            .send()
            .await
            .map_err(|e| LiverecError::notification(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(LiverecError::notification(format!(
                "telegram returned {status}: {detail}"
            )));
        }
        Ok(())
    }
}
