use axum::{extract::State, response::IntoResponse, Json};
use common::types::answer::ChatRequest;
use tracing::info;

use crate::{api_state::ApiState, error::ApiError};

pub async fn chat(
    State(state): State<ApiState>,
    Json(request): Json<ChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    request.validate()?;

    info!(
        query_chars = request.query.chars().count(),
        history_turns = request.history.len(),
        language = request.language.as_deref().unwrap_or("auto"),
        "Received chat request"
    );

    let answer = state.service.answer(&request).await;

    Ok(Json(answer))
}
