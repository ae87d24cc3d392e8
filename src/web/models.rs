use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::AppError;
use crate::probes::CheckResult;
use crate::targets::{NewTarget, TargetKind};

/// A stored check as returned by `GET /checks`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResponse {
    pub target: String,
    #[serde(rename = "type")]
    pub kind: TargetKind,
    pub status: bool,
    /// Milliseconds.
    pub duration: u64,
    pub checked_at: DateTime<Utc>,
    pub message: String,
}

impl From<CheckResult> for CheckResponse {
    fn from(result: CheckResult) -> Self {
        Self {
            target: result.target,
            kind: result.kind,
            status: result.success,
            duration: u64::try_from(result.latency.as_millis()).unwrap_or(u64::MAX),
            checked_at: result.checked_at,
            message: result.message.unwrap_or_default(),
        }
    }
}

/// Body of `POST /targets` and `PUT /targets`. The id is only read on update.
#[derive(Debug, Deserialize)]
pub struct TargetPayload {
    pub id: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl TargetPayload {
    pub fn into_new_target(self) -> Result<NewTarget, AppError> {
        let name = self.name.trim().to_string();
        let address = self.url.trim().to_string();
        if name.is_empty() {
            return Err(AppError::InvalidInput("name is required".to_string()));
        }
        if address.is_empty() {
            return Err(AppError::InvalidInput("url is required".to_string()));
        }
        let kind = self
            .kind
            .parse::<TargetKind>()
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;

        Ok(NewTarget {
            name,
            address,
            kind,
            username: self.username.filter(|u| !u.is_empty()),
            password: self.password.filter(|p| !p.is_empty()),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: Option<String>,
}

impl IdQuery {
    pub fn parse(&self) -> Result<i64, AppError> {
        self.id
            .as_deref()
            .and_then(|id| id.trim().parse().ok())
            .ok_or_else(|| AppError::InvalidInput("invalid id".to_string()))
    }
}

#[derive(Debug, Deserialize)]
pub struct ClearQuery {
    pub target: Option<String>,
}
