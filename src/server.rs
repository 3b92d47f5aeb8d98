use axum::{
    Json, Router,
    extract::Request,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    middleware::Next,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use tracing::info;

use crate::AppState;
use crate::auth::{self, GoogleProvider, OAuthCredentials};
use crate::chat::{self, HttpGenerator};
use crate::config::{AppConfig, CorsConfig};

/// Start the Axum server with the provided configuration.
///
/// The generation service must be reachable: a model that cannot be loaded
/// aborts startup. Missing OAuth credentials only disable the login routes.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    let generator = HttpGenerator::connect(&config.chat).await?;
    let provider = GoogleProvider::new(&config.oauth)?;

    if let Err(e) = OAuthCredentials::from_config(&config.oauth) {
        tracing::warn!(error = %e, "Login endpoints will fail until OAuth is configured");
    }

    let state = AppState::new(Arc::clone(&config), Arc::new(provider), Arc::new(generator));
    // Conversations live as long as an unused session would
    let _sweeper = spawn_sweeper(
        &state,
        Duration::from_secs(config.session.sweep_interval_secs),
        Duration::from_secs(config.session.ttl_secs),
    );

    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

/// Assemble every route and the shared middleware stack.
pub fn build_router(state: AppState) -> Router {
    let timeout_duration = Duration::from_secs(state.config.server.request_timeout_secs);
    let cors = cors_layer(&state.config.cors);

    Router::new()
        .route("/", get(index))
        .merge(auth::routes::router())
        .merge(chat::routes::router())
        .layer(axum::middleware::from_fn(
            move |req: Request, next: Next| async move {
                match tokio::time::timeout(timeout_duration, next.run(req)).await {
                    Ok(res) => res,
                    Err(_) => (StatusCode::REQUEST_TIMEOUT, "Request timed out").into_response(),
                }
            },
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Cross-origin policy for the configured development frontends.
fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Every `interval`, evict expired sessions and conversations idle for at
/// least `max_idle`. A zero interval disables the sweep.
pub fn spawn_sweeper(
    state: &AppState,
    interval: Duration,
    max_idle: Duration,
) -> Option<JoinHandle<()>> {
    if interval.is_zero() {
        return None;
    }

    let sessions = state.sessions().clone();
    let chat = Arc::clone(&state.chat);
    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let sessions_removed = sessions.cleanup_expired();
            let conversations_removed = chat.cleanup_idle(max_idle);
            if sessions_removed > 0 || conversations_removed > 0 {
                tracing::debug!(
                    sessions_removed,
                    conversations_removed,
                    sessions = sessions.len(),
                    conversations = chat.conversation_count(),
                    "Swept expired state"
                );
            }
        }
    }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Landing Page
// ─────────────────────────────────────────────────────────────────────────────

/// GET / - Describe the available endpoints.
async fn index(headers: HeaderMap) -> Response {
    if prefers_html(&headers) {
        return Html(INDEX_HTML).into_response();
    }

    Json(json!({
        "message": "OAuth Chat Server",
        "endpoints": {
            "login": "/login",
            "callback": "/auth/callback",
            "user_info": "/auth/me",
            "logout": "/auth/logout",
            "chat": "/chat",
            "reset_chat": "/chat/reset",
        }
    }))
    .into_response()
}

fn prefers_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("text/html"))
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>OAuth Chat Server</title>
</head>
<body>
  <h1>OAuth Chat Server</h1>
  <p><a href="/login">Login with Google</a></p>
  <ul>
    <li><code>GET /auth/me</code> current user</li>
    <li><code>POST /auth/logout</code> end the session</li>
    <li><code>POST /chat</code> talk to the model</li>
    <li><code>POST /chat/reset</code> clear the conversation</li>
  </ul>
</body>
</html>
"#;
