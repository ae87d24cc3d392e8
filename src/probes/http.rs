use async_trait::async_trait;
use reqwest::{Client, StatusCode, redirect::Policy};
use std::time::{Duration, Instant};

use super::{CheckResult, Probe};
use crate::targets::TargetKind;

pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Issues a GET and succeeds only on `200 OK`. Redirects are not followed,
/// so a 301 or 304 counts as a failure.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    url: String,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: HTTP_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Probe for HttpProbe {
    fn kind(&self) -> TargetKind {
        TargetKind::Http
    }

    fn label(&self) -> &str {
        &self.url
    }

    async fn check(&self) -> CheckResult {
        let start_time = Instant::now();
        let client = match Client::builder()
            .timeout(self.timeout)
            .redirect(Policy::none())
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                return CheckResult::failure(
                    &self.url,
                    TargetKind::Http,
                    start_time.elapsed(),
                    format!("Error: failed to build HTTP client: {e}"),
                );
            }
        };

        match client.get(&self.url).send().await {
            Ok(response) => {
                let latency = start_time.elapsed();
                let status = response.status();
                CheckResult::new(
                    &self.url,
                    TargetKind::Http,
                    status == StatusCode::OK,
                    latency,
                    Some(status.to_string()),
                )
            }
            Err(e) => {
                let details = if e.is_timeout() {
                    "Error: Request timed out".to_string()
                } else {
                    format!("Error: {e}")
                };
                CheckResult::failure(&self.url, TargetKind::Http, start_time.elapsed(), details)
            }
        }
    }
}
