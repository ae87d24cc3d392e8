use async_trait::async_trait;
use std::time::{Duration, Instant};

use super::{CheckResult, Probe};
use crate::targets::TargetKind;

pub const REDIS_TIMEOUT: Duration = Duration::from_secs(5);

/// Sends `PING` to a key-value store.
#[derive(Debug, Clone)]
pub struct RedisProbe {
    addr: String,
    username: Option<String>,
    password: Option<String>,
    timeout: Duration,
}

impl RedisProbe {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            username: None,
            password: None,
            timeout: REDIS_TIMEOUT,
        }
    }

    pub fn with_auth(mut self, username: Option<String>, password: Option<String>) -> Self {
        self.username = username;
        self.password = password;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn connection_url(&self) -> String {
        let addr = self
            .addr
            .trim()
            .trim_start_matches("rediss://")
            .trim_start_matches("redis://");

        let auth = match (&self.username, &self.password) {
            (Some(user), Some(pass)) => format!(
                "{}:{}@",
                urlencoding::encode(user),
                urlencoding::encode(pass)
            ),
            (None, Some(pass)) => format!(":{}@", urlencoding::encode(pass)),
            (Some(user), None) => format!("{}@", urlencoding::encode(user)),
            (None, None) => String::new(),
        };

        format!("redis://{auth}{addr}")
    }

    async fn ping(url: &str) -> ::redis::RedisResult<()> {
        let client = ::redis::Client::open(url)?;
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _pong: String = ::redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

#[async_trait]
impl Probe for RedisProbe {
    fn kind(&self) -> TargetKind {
        TargetKind::Redis
    }

    fn label(&self) -> &str {
        &self.addr
    }

    async fn check(&self) -> CheckResult {
        let start_time = Instant::now();
        let url = self.connection_url();

        // The timeout drops the connection future, releasing it on every path.
        let outcome = tokio::time::timeout(self.timeout, Self::ping(&url)).await;
        let latency = start_time.elapsed();

        match outcome {
            Ok(Ok(())) => CheckResult::success(&self.addr, TargetKind::Redis, latency),
            Ok(Err(e)) => CheckResult::failure(
                &self.addr,
                TargetKind::Redis,
                latency,
                format!("Error: {e}"),
            ),
            Err(_) => CheckResult::failure(
                &self.addr,
                TargetKind::Redis,
                latency,
                "Error: Connection timed out",
            ),
        }
    }
}
