use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use std::sync::Arc;
use tracing::info;

use crate::db::services;
use crate::web::models::{CheckResponse, ClearQuery};
use crate::web::{AppError, AppState};

pub fn create_check_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/checks", get(list_checks))
        .route("/targets/clear", post(clear_checks))
}

/// Checks inside the configured timeframe, newest first.
async fn list_checks(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<CheckResponse>>, AppError> {
    let hours = app_state.settings.snapshot().await.timeframe_hours;
    let checks = services::recent_checks(&app_state.db_pool, hours).await?;
    Ok(Json(checks.into_iter().map(CheckResponse::from).collect()))
}

async fn clear_checks(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<ClearQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let target = query
        .target
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::InvalidInput("missing target".to_string()))?;
    let removed = services::clear_checks(&app_state.db_pool, &target).await?;
    info!(target_label = %target, removed, "Cleared check history.");
    Ok(Json(serde_json::json!({ "removed": removed })))
}
