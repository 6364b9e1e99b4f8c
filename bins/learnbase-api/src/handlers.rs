// HTTP route handlers for the Learnbase API

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use learnbase_common::types::{ExerciseContent, ProgressSnapshot, Submission, Verdict};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::metrics;
use crate::AppState;

/// Error body returned for failures outside of validation itself
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct ExerciseQuery {
    pub topic: String,
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "basic".to_string()
}

#[derive(Debug, Deserialize)]
pub struct ProgressQuery {
    pub topic: String,
}

#[derive(Debug, Deserialize)]
pub struct ProgressUpdate {
    pub topic: String,
    #[serde(default)]
    pub delta: i64,
    /// Absolute value; takes precedence over `delta` when present
    #[serde(default)]
    pub value: Option<i64>,
}

/// POST /validate - Run a submission against its test cases
pub async fn validate(
    State(state): State<Arc<AppState>>,
    Json(submission): Json<Submission>,
) -> Json<Verdict> {
    let start = Instant::now();
    let verdict = state.validator.validate(&submission).await;
    metrics::record_validation(&verdict, start.elapsed());

    info!(
        passed = verdict.passed,
        test_cases = verdict.results.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Submission validated"
    );
    Json(verdict)
}

/// GET /exercise - Generate an exercise and attach the learner's progress
pub async fn get_exercise(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExerciseQuery>,
) -> Json<ExerciseContent> {
    let (mut exercise, source) = state.generator.generate(&query.topic, &query.level).await;
    metrics::record_exercise(source.as_str());

    // Progress is decoration here; a store outage must not hide the exercise
    exercise.progress = match state.progress.get(&query.topic).await {
        Ok(progress) => Some(progress),
        Err(e) => {
            warn!(topic = %query.topic, error = %e, "Failed to read progress");
            None
        }
    };

    info!(
        topic = %query.topic,
        level = %query.level,
        source = source.as_str(),
        "Exercise served"
    );
    Json(exercise)
}

/// GET /progress - Current progress for a topic
pub async fn get_progress(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProgressQuery>,
) -> Result<Json<ProgressSnapshot>, ApiError> {
    match state.progress.get(&query.topic).await {
        Ok(progress) => Ok(Json(ProgressSnapshot {
            topic: query.topic,
            progress,
        })),
        Err(e) => {
            error!(topic = %query.topic, error = %e, "Failed to read progress");
            Err(ApiError::internal(format!("Failed to read progress: {}", e)))
        }
    }
}

/// POST /progress - Bump (or set) progress for a topic
pub async fn update_progress(
    State(state): State<Arc<AppState>>,
    Query(update): Query<ProgressUpdate>,
) -> Result<Json<ProgressSnapshot>, ApiError> {
    let result = match update.value {
        Some(value) => state.progress.set(&update.topic, value).await,
        None => state.progress.bump(&update.topic, update.delta).await,
    };

    match result {
        Ok(progress) => {
            info!(
                topic = %update.topic,
                delta = update.delta,
                progress,
                backend = state.progress.backend_name(),
                "Progress updated"
            );
            Ok(Json(ProgressSnapshot {
                topic: update.topic,
                progress,
            }))
        }
        Err(e) => {
            error!(topic = %update.topic, error = %e, "Failed to update progress");
            Err(ApiError::internal(format!("Failed to update progress: {}", e)))
        }
    }
}

/// GET /status - Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /metrics - Prometheus text exposition
pub async fn export_metrics() -> Response {
    match metrics::render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            ApiError::internal(format!("Failed to encode metrics: {}", e)).into_response()
        }
    }
}
