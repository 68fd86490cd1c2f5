use std::time::Duration;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::state::AppState;
use crate::store::campgrounds;

/// Liveness: the process answers.
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Readiness: the campground tables answer within the timeout.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let count = campgrounds::count(&state.db);
    match tokio::time::timeout(Duration::from_secs(5), count).await {
        Ok(Ok(count)) => (
            StatusCode::OK,
            Json(json!({
                "status": "ready",
                "campgrounds": count,
                "geocoding": state.config.geocoding.token().is_some(),
            })),
        ),
        Ok(Err(e)) => {
            tracing::warn!("Readiness check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "status": "unavailable", "error": e.to_string() })))
        }
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "status": "unavailable", "error": "timeout" }))),
    }
}
