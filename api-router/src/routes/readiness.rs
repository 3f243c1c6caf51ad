use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::api_state::ApiState;

/// Readiness probe: returns 200 once backends are initialized, else 503.
///
/// The body reports which retrieval mode and generation models are in use.
pub async fn ready(State(state): State<ApiState>) -> impl IntoResponse {
    let status = state.service.status();
    if status.ready {
        (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "checks": status
            })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "warming_up",
                "checks": status
            })),
        )
    }
}
