use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::time::Duration;

use super::error::StorageError;
use crate::probes::CheckResult;
use crate::settings::{MAX_FREQUENCY_SECONDS, MAX_TIMEFRAME_HOURS, Settings};
use crate::targets::Target;

/// Corresponds to the `targets` table.
#[derive(Debug, Clone, FromRow)]
pub struct TargetRow {
    pub id: i64,
    pub name: String,
    pub url: String,
    #[sqlx(rename = "type")]
    pub kind: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub subscribed: bool,
}

impl TryFrom<TargetRow> for Target {
    type Error = StorageError;

    fn try_from(row: TargetRow) -> Result<Self, Self::Error> {
        Ok(Target {
            id: row.id,
            name: row.name,
            address: row.url,
            kind: row.kind.parse()?,
            username: row.username,
            password: row.password,
            subscribed: row.subscribed,
        })
    }
}

/// Corresponds to the `checks` table.
#[derive(Debug, Clone, FromRow)]
pub struct CheckRow {
    pub target: String,
    #[sqlx(rename = "type")]
    pub kind: String,
    pub status: bool,
    pub duration_ms: i64,
    pub checked_at: DateTime<Utc>,
    pub message: Option<String>,
}

impl TryFrom<CheckRow> for CheckResult {
    type Error = StorageError;

    fn try_from(row: CheckRow) -> Result<Self, Self::Error> {
        Ok(CheckResult {
            target: row.target,
            kind: row.kind.parse()?,
            success: row.status,
            latency: Duration::from_millis(row.duration_ms.max(0) as u64),
            checked_at: row.checked_at,
            message: row.message,
        })
    }
}

/// The single row of the `settings` table.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct SettingsRow {
    pub frequency: i64,
    pub timeframe_hours: i64,
}

impl From<SettingsRow> for Settings {
    fn from(row: SettingsRow) -> Self {
        Settings {
            frequency: row.frequency.clamp(1, MAX_FREQUENCY_SECONDS as i64) as u64,
            timeframe_hours: row.timeframe_hours.clamp(1, i64::from(MAX_TIMEFRAME_HOURS)) as u32,
        }
    }
}
