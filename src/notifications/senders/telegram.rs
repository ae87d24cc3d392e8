use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use super::{MessageTransport, SenderError};
use crate::config::TelegramConfig;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// A sender for pushing notifications via the Telegram Bot API.
pub struct TelegramSender {
    client: Client,
    config: Option<TelegramConfig>,
    api_base: String,
}

impl TelegramSender {
    pub fn new(config: Option<TelegramConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
            api_base: TELEGRAM_API_BASE.to_string(),
        }
    }

    /// Points the sender at another Bot API host.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Escapes text for Telegram MarkdownV2.
    /// Characters to escape: _ * [ ] ( ) ~ ` > # + - = | { } . !
    fn escape_markdown_v2(text: &str) -> String {
        let mut escaped_text = String::with_capacity(text.len());
        for c in text.chars() {
            if matches!(
                c,
                '_' | '*' | '[' | ']' | '(' | ')' | '~' | '`' | '>' | '#' | '+' | '-' | '='
                    | '|' | '{' | '}' | '.' | '!'
            ) {
                escaped_text.push('\\');
            }
            escaped_text.push(c);
        }
        escaped_text
    }
}

#[derive(Serialize)]
struct TelegramMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

#[async_trait]
impl MessageTransport for TelegramSender {
    async fn send(&self, message: &str) -> Result<(), SenderError> {
        let Some(config) = &self.config else {
            debug!("Telegram is not configured, dropping message.");
            return Ok(());
        };

        let api_url = format!("{}/bot{}/sendMessage", self.api_base, config.bot_token);
        let escaped_message = Self::escape_markdown_v2(message);
        let payload = TelegramMessage {
            chat_id: &config.chat_id,
            text: &escaped_message,
            parse_mode: "MarkdownV2",
        };

        let response = self.client.post(&api_url).json(&payload).send().await?;
        let status = response.status();

        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(SenderError::SendFailed(format!(
                "Telegram API returned non-success status: {status}. Body: {error_body}"
            )));
        }

        Ok(())
    }

    fn is_configured(&self) -> bool {
        self.config.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn config() -> Option<TelegramConfig> {
        Some(TelegramConfig {
            bot_token: "123:abc".to_string(),
            chat_id: "42".to_string(),
        })
    }

    #[test]
    fn test_escape_markdown_v2() {
        assert_eq!(
            TelegramSender::escape_markdown_v2("Resource down: api.example.com (prod)!"),
            "Resource down: api\\.example\\.com \\(prod\\)\\!"
        );
        assert_eq!(TelegramSender::escape_markdown_v2("plain text"), "plain text");
    }

    #[tokio::test]
    async fn test_send_posts_escaped_message() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/bot123:abc/sendMessage")
            .match_body(Matcher::PartialJson(json!({
                "chat_id": "42",
                "text": "Resource down: Local Redis\\.",
                "parse_mode": "MarkdownV2",
            })))
            .with_status(200)
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;

        let sender = TelegramSender::new(config()).with_api_base(server.url());
        sender.send("Resource down: Local Redis.").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_api_error_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/bot123:abc/sendMessage")
            .with_status(401)
            .with_body(r#"{"ok":false,"description":"Unauthorized"}"#)
            .create_async()
            .await;

        let sender = TelegramSender::new(config()).with_api_base(server.url());
        match sender.send("hello").await {
            Err(SenderError::SendFailed(msg)) => assert!(msg.contains("Unauthorized")),
            other => panic!("expected SendFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unconfigured_sender_is_a_no_op() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let sender = TelegramSender::new(None).with_api_base(server.url());
        assert!(!sender.is_configured());
        sender.send("hello").await.unwrap();
        mock.assert_async().await;
    }
}
