use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
};
use std::sync::Arc;
use tracing::{error, info};

use crate::db::services;
use crate::targets::Target;
use crate::web::models::{IdQuery, TargetPayload};
use crate::web::{AppError, AppState};

pub fn create_target_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/targets",
            get(list_targets)
                .post(create_target)
                .put(update_target)
                .delete(delete_target),
        )
        .route("/targets/subscribe", post(subscribe_target))
        .route("/targets/unsubscribe", post(unsubscribe_target))
}

async fn list_targets(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<Target>>, AppError> {
    Ok(Json(services::list_targets(&app_state.db_pool).await?))
}

/// Stores the target and probes it once in the background so its first
/// result shows up without waiting for the next cycle.
async fn create_target(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<TargetPayload>,
) -> Result<(StatusCode, Json<Target>), AppError> {
    let new_target = payload.into_new_target()?;
    let target = services::add_target(&app_state.db_pool, &new_target).await?;
    info!(
        target_id = target.id,
        target_name = %target.name,
        kind = %target.kind,
        "Target created."
    );

    let probe = app_state.probes.probe_for(&target);
    let pool = app_state.db_pool.clone();
    let target_id = target.id;
    tokio::spawn(async move {
        let result = probe.check().await;
        if let Err(e) = services::save_check(&pool, &result).await {
            error!(target_id, error = %e, "Failed to save initial check result.");
        }
    });

    app_state.reset.trigger();
    Ok((StatusCode::CREATED, Json(target)))
}

async fn update_target(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<TargetPayload>,
) -> Result<Json<Target>, AppError> {
    let id = payload
        .id
        .ok_or_else(|| AppError::InvalidInput("id is required".to_string()))?;
    let new_target = payload.into_new_target()?;
    let target = services::update_target(&app_state.db_pool, id, &new_target).await?;
    info!(target_id = id, "Target updated.");

    app_state.reset.trigger();
    Ok(Json(target))
}

async fn delete_target(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<IdQuery>,
) -> Result<StatusCode, AppError> {
    let id = query.parse()?;
    services::delete_target(&app_state.db_pool, id).await?;
    info!(target_id = id, "Target deleted.");

    app_state.reset.trigger();
    Ok(StatusCode::OK)
}

async fn subscribe_target(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<IdQuery>,
) -> Result<StatusCode, AppError> {
    set_subscription(&app_state, query.parse()?, true).await
}

async fn unsubscribe_target(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<IdQuery>,
) -> Result<StatusCode, AppError> {
    set_subscription(&app_state, query.parse()?, false).await
}

async fn set_subscription(
    app_state: &AppState,
    id: i64,
    subscribed: bool,
) -> Result<StatusCode, AppError> {
    services::set_subscribed(&app_state.db_pool, id, subscribed).await?;
    info!(target_id = id, subscribed, "Target subscription changed.");
    app_state.reset.trigger();
    Ok(StatusCode::OK)
}
