use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::handlers;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/validate", post(handlers::validate))
        .route("/exercise", get(handlers::get_exercise))
        .route(
            "/progress",
            get(handlers::get_progress).post(handlers::update_progress),
        )
        .route("/status", get(handlers::health_check))
        .route("/metrics", get(handlers::export_metrics))
        // Browser frontends call the API from another origin
        .layer(CorsLayer::permissive())
}
