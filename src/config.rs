use serde::Deserialize;
use std::net::SocketAddr;
use std::{env, fs};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid listen address '{0}'")]
    InvalidListenAddr(String),
}

/// Telegram bot credentials. Notifications are disabled when absent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub database_url: String,
    pub log_dir: String,
    pub telegram: Option<TelegramConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            database_url: "sqlite://monitor.db?mode=rwc".to_string(),
            log_dir: "logs".to_string(),
            telegram: None,
        }
    }
}

impl ServerConfig {
    /// Loads the optional TOML file, then applies environment overrides.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => {
                let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_string(),
                    source,
                })?;
                Self::from_toml_str(&content)?
            }
            None => Self::default(),
        };
        let config = base.with_overrides(|key| env::var(key).ok());
        config.socket_addr()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Applies `LISTEN_ADDR`, `DATABASE_URL`, `LOG_DIR`, `TELEGRAM_BOT_TOKEN`
    /// and `TELEGRAM_CHAT_ID` as returned by `lookup`. Empty values are ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(addr) = get("LISTEN_ADDR") {
            self.listen_addr = addr;
        }
        if let Some(url) = get("DATABASE_URL") {
            self.database_url = url;
        }
        if let Some(dir) = get("LOG_DIR") {
            self.log_dir = dir;
        }

        let token = get("TELEGRAM_BOT_TOKEN");
        let chat_id = get("TELEGRAM_CHAT_ID");
        match (token, chat_id, self.telegram.take()) {
            (Some(bot_token), Some(chat_id), _) => {
                self.telegram = Some(TelegramConfig { bot_token, chat_id });
            }
            (token, chat_id, Some(file)) => {
                self.telegram = Some(TelegramConfig {
                    bot_token: token.unwrap_or(file.bot_token),
                    chat_id: chat_id.unwrap_or(file.chat_id),
                });
            }
            (_, _, None) => {}
        }
        self
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen_addr
            .parse()
            .map_err(|_| ConfigError::InvalidListenAddr(self.listen_addr.clone()))
    }
}
