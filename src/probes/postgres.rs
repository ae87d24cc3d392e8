use async_trait::async_trait;
use sqlx::Connection;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use std::str::FromStr;
use std::time::{Duration, Instant};

use super::{CheckResult, Probe};
use crate::targets::TargetKind;

pub const POSTGRES_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_DATABASE: &str = "postgres";

/// Opens a connection and pings it.
#[derive(Debug, Clone)]
pub struct PostgresProbe {
    addr: String,
    credentials: Option<(String, String)>,
    database: Option<String>,
    timeout: Duration,
}

impl PostgresProbe {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            credentials: None,
            database: None,
            timeout: POSTGRES_TIMEOUT,
        }
    }

    pub fn with_credentials(mut self, user: impl Into<String>, pass: impl Into<String>) -> Self {
        self.credentials = Some((user.into(), pass.into()));
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the connection URL for the stored address.
    ///
    /// The address may carry its own database segment (`host:5432/app`) and
    /// query string; a caller-supplied `sslmode` is kept, otherwise
    /// `sslmode=disable` is added. `connect_timeout=10` is always appended.
    pub fn connection_url(&self) -> String {
        let addr = self
            .addr
            .trim()
            .trim_start_matches("postgresql://")
            .trim_start_matches("postgres://");

        let (location, existing_params) = match addr.split_once('?') {
            Some((location, params)) => (location, params),
            None => (addr, ""),
        };

        let mut params = Vec::new();
        if !existing_params.is_empty() {
            params.push(existing_params);
        }
        params.push("connect_timeout=10");
        if !existing_params.contains("sslmode=") {
            params.push("sslmode=disable");
        }
        let query = params.join("&");

        let host_and_db = if location.contains('/') && !location.ends_with('/') {
            location.to_string()
        } else {
            let database = self
                .database
                .as_deref()
                .filter(|db| !db.is_empty())
                .unwrap_or(DEFAULT_DATABASE);
            format!("{}/{database}", location.trim_end_matches('/'))
        };

        match &self.credentials {
            Some((user, pass)) => format!(
                "postgres://{}:{}@{host_and_db}?{query}",
                urlencoding::encode(user),
                urlencoding::encode(pass)
            ),
            None => format!("postgres://{host_and_db}?{query}"),
        }
    }

    async fn connect_and_ping(url: &str) -> Result<(), sqlx::Error> {
        let options = PgConnectOptions::from_str(url)?;
        let mut conn = PgConnection::connect_with(&options).await?;
        conn.ping().await?;
        conn.close().await
    }
}

#[async_trait]
impl Probe for PostgresProbe {
    fn kind(&self) -> TargetKind {
        TargetKind::Postgres
    }

    fn label(&self) -> &str {
        &self.addr
    }

    async fn check(&self) -> CheckResult {
        let start_time = Instant::now();
        let url = self.connection_url();

        let outcome = tokio::time::timeout(self.timeout, Self::connect_and_ping(&url)).await;
        let latency = start_time.elapsed();

        match outcome {
            Ok(Ok(())) => CheckResult::success(&self.addr, TargetKind::Postgres, latency),
            Ok(Err(e)) => CheckResult::failure(
                &self.addr,
                TargetKind::Postgres,
                latency,
                format!("Error: {e}"),
            ),
            Err(_) => CheckResult::failure(
                &self.addr,
                TargetKind::Postgres,
                latency,
                "Error: Connection timed out",
            ),
        }
    }
}
