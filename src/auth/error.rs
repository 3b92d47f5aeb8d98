//! Errors raised by the login flow.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::session::StoreError;

/// Errors that can occur during the OAuth flow.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Client id, secret or redirect URI is not configured.
    #[error("Google OAuth not configured. Missing: {0}")]
    Config(String),

    /// The callback arrived without an authorization code.
    #[error("No authorization code received")]
    MissingCode,

    /// The token endpoint answered without an access token.
    #[error("Authentication failed: failed to get access token ({0})")]
    TokenExchange(String),

    /// Network or parse failure while talking to the provider.
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Authentication failed: {0}")]
    Store(#[from] StoreError),
}

impl AuthError {
    /// HTTP status reported for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingCode => StatusCode::BAD_REQUEST,
            Self::Config(_) | Self::TokenExchange(_) | Self::AuthFailed(_) | Self::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "OAuth flow failed");
        } else {
            tracing::warn!(error = %self, "OAuth callback rejected");
        }
        (
            status,
            Json(serde_json::json!({ "detail": self.to_string() })),
        )
            .into_response()
    }
}
