use async_trait::async_trait;
use thiserror::Error;

pub mod telegram;

pub use telegram::TelegramSender;

#[derive(Error, Debug)]
pub enum SenderError {
    #[error("Failed to send notification: {0}")]
    SendFailed(String),
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

/// Delivers a plain-text message to the configured channel.
///
/// An unconfigured transport accepts every message and sends nothing.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    async fn send(&self, message: &str) -> Result<(), SenderError>;

    fn is_configured(&self) -> bool {
        true
    }
}
