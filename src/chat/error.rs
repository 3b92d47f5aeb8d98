//! Chat failures, split by whether a request can recover from them.

use std::time::Duration;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// How a [`ChatError`] must be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Infrastructure fault: propagate and fail the request.
    Fatal,
    /// Absorbed locally by substituting a canned reply.
    Recoverable,
}

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// The generation service could not be reached or identified.
    #[error("Could not load AI model: {0}")]
    ModelLoad(String),

    /// A single generation call failed.
    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Generation timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

impl ChatError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ModelLoad(_) => ErrorKind::Fatal,
            Self::Generation(_) | Self::Timeout(_) => ErrorKind::Recoverable,
        }
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "Chat request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "detail": format!("Chat error: {self}") })),
        )
            .into_response()
    }
}
