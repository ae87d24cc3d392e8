//! Query functions over the SQLite pool.
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use sqlx::SqlitePool;
use tracing::info;

use super::error::StorageError;
use super::models::{CheckRow, SettingsRow, TargetRow};
use crate::probes::CheckResult;
use crate::settings::Settings;
use crate::targets::{NewTarget, Target, TargetKind};

const SCHEMA: [&str; 4] = [
    r#"
    CREATE TABLE IF NOT EXISTS targets (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        url TEXT NOT NULL,
        type TEXT NOT NULL,
        username TEXT,
        password TEXT,
        subscribed INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS checks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        target TEXT NOT NULL,
        type TEXT NOT NULL,
        status INTEGER NOT NULL,
        duration_ms INTEGER NOT NULL,
        checked_at TEXT NOT NULL,
        message TEXT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_checks_checked_at ON checks (checked_at)",
    r#"
    CREATE TABLE IF NOT EXISTS settings (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        frequency INTEGER NOT NULL,
        timeframe_hours INTEGER NOT NULL
    )
    "#,
];

pub async fn init_schema(pool: &SqlitePool) -> Result<(), StorageError> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

/// Targets inserted on first run, when the table is still empty.
pub fn default_targets() -> Vec<NewTarget> {
    vec![
        NewTarget::new("Google", "https://www.google.com", TargetKind::Http),
        NewTarget::new("GitHub", "https://github.com", TargetKind::Http),
        NewTarget::new("Local Postgres", "localhost:5432", TargetKind::Postgres),
        NewTarget::new("Local Redis", "localhost:6379", TargetKind::Redis),
    ]
}

/// Returns the number of targets inserted.
pub async fn seed_default_targets(pool: &SqlitePool) -> Result<usize, StorageError> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM targets")
        .fetch_one(pool)
        .await?;
    if count > 0 {
        return Ok(0);
    }

    let defaults = default_targets();
    for target in &defaults {
        add_target(pool, target).await?;
    }
    info!(count = defaults.len(), "Seeded default targets.");
    Ok(defaults.len())
}

// --- Target Functions ---

/// All targets in id order.
pub async fn list_targets(pool: &SqlitePool) -> Result<Vec<Target>, StorageError> {
    let rows = sqlx::query_as::<_, TargetRow>(
        "SELECT id, name, url, type, username, password, subscribed FROM targets ORDER BY id",
    )
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(Target::try_from).collect()
}

pub async fn get_target(pool: &SqlitePool, id: i64) -> Result<Option<Target>, StorageError> {
    let row = sqlx::query_as::<_, TargetRow>(
        "SELECT id, name, url, type, username, password, subscribed FROM targets WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    row.map(Target::try_from).transpose()
}

pub async fn add_target(pool: &SqlitePool, target: &NewTarget) -> Result<Target, StorageError> {
    let row = sqlx::query_as::<_, TargetRow>(
        r#"
        INSERT INTO targets (name, url, type, username, password, subscribed)
        VALUES (?, ?, ?, ?, ?, 0)
        RETURNING id, name, url, type, username, password, subscribed
        "#,
    )
    .bind(&target.name)
    .bind(&target.address)
    .bind(target.kind.as_str())
    .bind(&target.username)
    .bind(&target.password)
    .fetch_one(pool)
    .await?;
    Target::try_from(row)
}

/// Replaces the editable fields of a target; the subscription flag is kept.
pub async fn update_target(
    pool: &SqlitePool,
    id: i64,
    target: &NewTarget,
) -> Result<Target, StorageError> {
    let row = sqlx::query_as::<_, TargetRow>(
        r#"
        UPDATE targets SET name = ?, url = ?, type = ?, username = ?, password = ?
        WHERE id = ?
        RETURNING id, name, url, type, username, password, subscribed
        "#,
    )
    .bind(&target.name)
    .bind(&target.address)
    .bind(target.kind.as_str())
    .bind(&target.username)
    .bind(&target.password)
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(Target::try_from)
        .transpose()?
        .ok_or(StorageError::TargetNotFound(id))
}

pub async fn delete_target(pool: &SqlitePool, id: i64) -> Result<(), StorageError> {
    let result = sqlx::query("DELETE FROM targets WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(StorageError::TargetNotFound(id));
    }
    Ok(())
}

pub async fn set_subscribed(
    pool: &SqlitePool,
    id: i64,
    subscribed: bool,
) -> Result<(), StorageError> {
    let result = sqlx::query("UPDATE targets SET subscribed = ? WHERE id = ?")
        .bind(subscribed)
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(StorageError::TargetNotFound(id));
    }
    Ok(())
}

// --- Check Functions ---

pub async fn save_check(pool: &SqlitePool, result: &CheckResult) -> Result<(), StorageError> {
    let duration_ms = i64::try_from(result.latency.as_millis()).unwrap_or(i64::MAX);
    sqlx::query(
        r#"
        INSERT INTO checks (target, type, status, duration_ms, checked_at, message)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&result.target)
    .bind(result.kind.as_str())
    .bind(result.success)
    .bind(duration_ms)
    .bind(result.checked_at)
    .bind(&result.message)
    .execute(pool)
    .await?;
    Ok(())
}

/// Checks recorded within the last `hours`, newest first.
pub async fn recent_checks(
    pool: &SqlitePool,
    hours: u32,
) -> Result<Vec<CheckResult>, StorageError> {
    let cutoff = Utc::now()
        .checked_sub_signed(ChronoDuration::hours(i64::from(hours)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let rows = sqlx::query_as::<_, CheckRow>(
        r#"
        SELECT target, type, status, duration_ms, checked_at, message FROM checks
        WHERE checked_at >= ?
        ORDER BY checked_at DESC, id DESC
        "#,
    )
    .bind(cutoff)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(CheckResult::try_from).collect()
}

/// Deletes the history recorded under a target label. Returns the number of
/// rows removed.
pub async fn clear_checks(pool: &SqlitePool, target: &str) -> Result<u64, StorageError> {
    let result = sqlx::query("DELETE FROM checks WHERE target = ?")
        .bind(target)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

// --- Settings Functions ---

/// Stored settings, or the defaults when none have been saved yet.
pub async fn load_settings(pool: &SqlitePool) -> Result<Settings, StorageError> {
    let row = sqlx::query_as::<_, SettingsRow>(
        "SELECT frequency, timeframe_hours FROM settings WHERE id = 1",
    )
    .fetch_optional(pool)
    .await?;
    Ok(row.map(Settings::from).unwrap_or_default())
}

pub async fn save_settings(pool: &SqlitePool, settings: &Settings) -> Result<(), StorageError> {
    let frequency = i64::try_from(settings.frequency).unwrap_or(i64::MAX);
    sqlx::query(
        r#"
        INSERT INTO settings (id, frequency, timeframe_hours) VALUES (1, ?, ?)
        ON CONFLICT (id) DO UPDATE SET
            frequency = excluded.frequency,
            timeframe_hours = excluded.timeframe_hours
        "#,
    )
    .bind(frequency)
    .bind(i64::from(settings.timeframe_hours))
    .execute(pool)
    .await?;
    Ok(())
}
