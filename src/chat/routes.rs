//! HTTP handlers for the chat endpoint.

use axum::{
    Json, Router,
    extract::State,
    routing::post,
};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use crate::auth::SESSION_COOKIE;

use super::ChatError;

/// Cookie identifying an anonymous caller's conversation.
pub const CHAT_COOKIE: &str = "chat_id";

/// Routes for `/chat` and `/chat/reset`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/chat", post(chat))
        .route("/chat/reset", post(reset_chat))
}

/// Request body for the chat API.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResetResponse {
    pub message: String,
}

/// Conversation key for a logged-in session.
#[must_use]
pub fn user_conversation(session_id: &str) -> String {
    format!("user:{session_id}")
}

/// Conversation key for an anonymous caller.
#[must_use]
pub fn guest_conversation(chat_id: &str) -> String {
    format!("guest:{chat_id}")
}

/// Resolve the caller's conversation key without minting a new one.
fn existing_conversation(state: &AppState, jar: &CookieJar) -> Option<String> {
    if let Some(cookie) = jar.get(SESSION_COOKIE)
        && state.oauth.current_user(Some(cookie.value())).is_some()
    {
        return Some(user_conversation(cookie.value()));
    }
    jar.get(CHAT_COOKIE)
        .map(|cookie| guest_conversation(cookie.value()))
}

/// POST /chat - Send a message and get the model's reply.
async fn chat(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<ChatRequest>,
) -> Result<(CookieJar, Json<ChatResponse>), ChatError> {
    let (jar, key) = match existing_conversation(&state, &jar) {
        Some(key) => (jar, key),
        None => {
            let chat_id = Uuid::new_v4().to_string();
            let key = guest_conversation(&chat_id);
            let cookie = Cookie::build((CHAT_COOKIE, chat_id))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax)
                .build();
            (jar.add(cookie), key)
        }
    };

    tracing::info!(
        conversation = %key,
        message_chars = req.message.len(),
        "Received chat request"
    );

    let response = state.chat.respond(&key, &req.message).await?;
    Ok((jar, Json(ChatResponse { response })))
}

/// POST /chat/reset - Forget the caller's conversation.
async fn reset_chat(State(state): State<AppState>, jar: CookieJar) -> Json<ChatResetResponse> {
    if let Some(key) = existing_conversation(&state, &jar) {
        state.chat.reset(&key);
        tracing::info!(conversation = %key, "Chat history reset");
    }
    Json(ChatResetResponse {
        message: "Chat history reset successfully".to_string(),
    })
}
