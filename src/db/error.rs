use thiserror::Error;

use crate::targets::UnknownTargetKind;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Stored row is invalid: {0}")]
    InvalidRow(#[from] UnknownTargetKind),
    #[error("Target not found: {0}")]
    TargetNotFound(i64),
}
