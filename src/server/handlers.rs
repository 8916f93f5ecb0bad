use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use super::error::ApiError;
use super::AppState;

#[derive(Debug, Deserialize)]
pub struct TalkParams {
    pub input: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TalkResponse {
    pub message: String,
    /// Retrieved chunks the answer was grounded on
    pub test: Vec<String>,
}

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "chunks": state.answerer.store().len(),
    }))
}

pub async fn talk(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TalkParams>,
) -> Result<Json<TalkResponse>, ApiError> {
    let question = params.input.unwrap_or_default();

    let answer = state.answerer.answer(&question).await.map_err(|e| {
        tracing::error!("Failed to answer question: {}", e);
        ApiError::from(e)
    })?;

    Ok(Json(TalkResponse {
        message: answer.message,
        test: answer.chunks,
    }))
}
