use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::StorageError;
use crate::notifications::SenderError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Not configured: {0}")]
    NotConfigured(String),
    #[error("Notification error: {0}")]
    TransportError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::DatabaseError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {msg}"),
            ),
            AppError::NotConfigured(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::TransportError(msg) => (StatusCode::BAD_GATEWAY, msg),
        };
        (status, Json(serde_json::json!({ "error": error_message }))).into_response()
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::TargetNotFound(id) => {
                AppError::NotFound(format!("Target {id} not found"))
            }
            other => AppError::DatabaseError(other.to_string()),
        }
    }
}

impl From<SenderError> for AppError {
    fn from(err: SenderError) -> Self {
        AppError::TransportError(err.to_string())
    }
}
