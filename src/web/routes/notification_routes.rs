use axum::{Json, Router, extract::State, routing::post};
use std::sync::Arc;
use tracing::info;

use crate::web::{AppError, AppState};

pub fn create_notification_router() -> Router<Arc<AppState>> {
    Router::new().route("/test-telegram", post(send_test_notification))
}

async fn send_test_notification(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !app_state.notifier.is_configured() {
        return Err(AppError::NotConfigured(
            "Telegram is not configured".to_string(),
        ));
    }
    app_state.notifier.send_test_message().await?;
    info!("Test notification sent.");
    Ok(Json(serde_json::json!({ "sent": true })))
}
