//! HTTP error responses

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use hopeline_core::Error;

/// Error returned by a handler; rendered as `500 {"detail": "..."}`
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub detail: String,
}

impl ApiError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self::new(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!(detail = %self.detail, "Chat request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, Json(self)).into_response()
    }
}
