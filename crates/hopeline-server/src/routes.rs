//! Route handlers

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use hopeline_core::{ChatRequest, Reply};

use crate::error::ApiError;
use crate::state::AppState;

/// Body of `GET /health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub retrieval: bool,
    pub model: String,
}

/// `POST /chat`
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<Reply>, ApiError> {
    let pipeline = state.pipeline().map_err(ApiError::new)?;

    tracing::info!(turns = request.messages.len(), "Chat request");
    let reply = pipeline.respond(&request).await?;

    Ok(Json(reply))
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        retrieval: state.retrieval_enabled(),
        model: state.model_name().to_string(),
    })
}
