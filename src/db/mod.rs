//! SQLite persistence for targets, check history and settings.
use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;

use crate::monitor::{CheckSink, TargetRegistry};
use crate::probes::CheckResult;
use crate::targets::Target;

pub mod error;
pub mod models;
pub mod services;

pub use error::StorageError;

/// Opens the pool, creating the database file if needed, and ensures the
/// schema exists.
pub async fn connect(database_url: &str) -> Result<SqlitePool, StorageError> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;
    services::init_schema(&pool).await?;
    Ok(pool)
}

/// The storage side of the monitor loop: registry reads and check writes.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl TargetRegistry for SqliteStore {
    async fn get_targets(&self) -> Result<Vec<Target>, StorageError> {
        services::list_targets(&self.pool).await
    }
}

#[async_trait]
impl CheckSink for SqliteStore {
    async fn save_check(&self, result: &CheckResult) -> Result<(), StorageError> {
        services::save_check(&self.pool, result).await
    }
}

/// A single-connection in-memory database with the schema applied.
#[cfg(test)]
pub(crate) async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    services::init_schema(&pool).await.unwrap();
    pool
}
