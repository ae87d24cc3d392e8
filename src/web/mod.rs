//! JSON API over targets, check history, settings and notifications.
use axum::{Router, http::Method, routing::get};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::monitor::ResetSignal;
use crate::notifications::Notifier;
use crate::probes::ProbeFactory;
use crate::settings::SettingsHandle;

pub mod error;
pub mod models;
pub mod routes;

pub use error::AppError;

pub struct AppState {
    pub db_pool: SqlitePool,
    pub settings: SettingsHandle,
    /// Fired on every settings or target change.
    pub reset: ResetSignal,
    pub notifier: Arc<Notifier>,
    pub probes: Arc<dyn ProbeFactory>,
}

async fn health_check_handler() -> &'static str {
    "OK"
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check_handler))
        .merge(routes::check_routes::create_check_router())
        .merge(routes::settings_routes::create_settings_router())
        .merge(routes::target_routes::create_target_router())
        .merge(routes::notification_routes::create_notification_router())
        .with_state(app_state)
        .layer(cors)
}
