//! HTTP handlers for the login flow.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::chat::routes::user_conversation;
use crate::session::UserProfile;

use super::oauth::cleared_session_cookie;
use super::{AuthError, SESSION_COOKIE};

/// Routes for `/login` and `/auth/*`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login))
        .route("/auth/callback", get(auth_callback))
        .route("/auth/me", get(current_user))
        .route("/auth/logout", post(logout))
}

/// Query parameters the provider appends to the redirect URI.
#[derive(Debug, Deserialize)]
struct CallbackQuery {
    #[serde(default)]
    code: Option<String>,
    /// Set instead of `code` when the user denies consent.
    #[serde(default)]
    error: Option<String>,
}

/// Response body of `/auth/me`.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub user: Option<UserProfile>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// `302 Found` with a `Location` header.
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// GET /login - Redirect the browser to the provider consent page.
async fn login(State(state): State<AppState>) -> Result<Response, AuthError> {
    let url = state.oauth.begin_login()?;
    tracing::debug!("Redirecting to identity provider");
    Ok(found(url.as_str()))
}

/// GET /auth/callback - Exchange the code, open a session, set the cookie.
async fn auth_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<CallbackQuery>,
) -> Result<(CookieJar, Response), AuthError> {
    if let Some(error) = &query.error {
        tracing::warn!(provider_error = %error, "Provider returned an error to the callback");
    }

    let session = state.oauth.handle_callback(query.code.as_deref()).await?;
    let jar = jar.add(state.oauth.session_cookie(&session));

    Ok((jar, found(state.oauth.frontend_url())))
}

/// GET /auth/me - Current user, or an explanatory error when logged out.
async fn current_user(State(state): State<AppState>, jar: CookieJar) -> Json<UserResponse> {
    let session_id = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());

    match state.oauth.current_user(session_id.as_deref()) {
        Some(user) => Json(UserResponse {
            user: Some(user),
            error: None,
        }),
        None => Json(UserResponse {
            user: None,
            error: Some("Not logged in".to_string()),
        }),
    }
}

/// POST /auth/logout - Drop the session and its conversation, clear the cookie.
async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Json<MessageResponse>) {
    let session_id = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());
    state.oauth.logout(session_id.as_deref());
    if let Some(id) = &session_id {
        state.chat.reset(&user_conversation(id));
    }

    (
        jar.remove(cleared_session_cookie()),
        Json(MessageResponse {
            message: "Logged out successfully".to_string(),
        }),
    )
}
