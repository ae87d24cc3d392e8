use axum::{Json, Router, extract::State, routing::get};
use std::sync::Arc;
use tracing::info;

use crate::db::services;
use crate::settings::Settings;
use crate::web::{AppError, AppState};

pub fn create_settings_router() -> Router<Arc<AppState>> {
    Router::new().route("/settings", get(get_settings).post(update_settings))
}

async fn get_settings(State(app_state): State<Arc<AppState>>) -> Json<Settings> {
    Json(app_state.settings.snapshot().await)
}

/// Persists the new settings, swaps them in and wakes the monitor loop so
/// the new frequency applies right away.
async fn update_settings(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<Settings>,
) -> Result<Json<Settings>, AppError> {
    payload.validate().map_err(AppError::InvalidInput)?;

    services::save_settings(&app_state.db_pool, &payload).await?;
    app_state.settings.replace(payload).await;
    app_state.reset.trigger();

    info!(
        frequency = payload.frequency,
        timeframe_hours = payload.timeframe_hours,
        "Settings updated."
    );
    Ok(Json(payload))
}
