mod common;

use axum::http::{StatusCode, header};
use oauth_chat_server::auth::{SESSION_COOKIE, routes::UserResponse};
use oauth_chat_server::config::AppConfig;
use serde_json::Value;

use common::{
    GOOD_CODE, ScriptedGenerator, configured_app, cookie_header, cookie_value, set_cookie,
    test_app,
};

#[tokio::test]
async fn test_login_redirects_to_provider() {
    let (_, server) = test_app(configured_app(), ScriptedGenerator::new(vec![]));

    let resp = server.get("/login").await;
    assert_eq!(resp.status_code(), StatusCode::FOUND);

    let location = resp.header(header::LOCATION);
    let location = url::Url::parse(location.to_str().unwrap()).unwrap();
    assert_eq!(location.host_str(), Some("accounts.google.com"));

    let params: std::collections::HashMap<_, _> = location.query_pairs().into_owned().collect();
    assert_eq!(params["client_id"], "test-client-id");
    assert_eq!(params["redirect_uri"], "http://localhost:8000/auth/callback");
    assert_eq!(params["scope"], "openid email profile");
    assert_eq!(params["response_type"], "code");
}

#[tokio::test]
async fn test_login_without_client_id_is_server_error() {
    let mut config = configured_app();
    config.oauth.client_id = None;
    let (_, server) = test_app(config, ScriptedGenerator::new(vec![]));

    let resp = server.get("/login").await;
    assert_eq!(resp.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(resp.headers().get(header::LOCATION).is_none());

    let body: Value = resp.json();
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.contains("GOOGLE_CLIENT_ID"), "detail was: {detail}");
}

#[tokio::test]
async fn test_callback_without_code_is_bad_request() {
    let (state, server) = test_app(configured_app(), ScriptedGenerator::new(vec![]));

    let resp = server.get("/auth/callback").await;
    assert_eq!(resp.status_code(), StatusCode::BAD_REQUEST);
    assert!(state.sessions().is_empty());
}

#[tokio::test]
async fn test_callback_without_config_is_server_error() {
    let (_, server) = test_app(AppConfig::default(), ScriptedGenerator::new(vec![]));

    let resp = server
        .get("/auth/callback")
        .add_query_param("code", GOOD_CODE)
        .await;
    assert_eq!(resp.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_callback_with_rejected_code() {
    let (state, server) = test_app(configured_app(), ScriptedGenerator::new(vec![]));

    let resp = server
        .get("/auth/callback")
        .add_query_param("code", "expired")
        .await;
    assert_eq!(resp.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = resp.json();
    assert!(body["detail"].as_str().unwrap().contains("invalid_grant"));
    assert!(set_cookie(&resp, SESSION_COOKIE).is_none());
    assert!(state.sessions().is_empty());
}

#[tokio::test]
async fn test_full_login_flow() {
    let (state, server) = test_app(configured_app(), ScriptedGenerator::new(vec![]));

    let resp = server
        .get("/auth/callback")
        .add_query_param("code", GOOD_CODE)
        .await;
    assert_eq!(resp.status_code(), StatusCode::FOUND);
    assert_eq!(resp.header(header::LOCATION), "http://localhost:5174/");

    let cookie = set_cookie(&resp, SESSION_COOKIE).unwrap();
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(cookie.contains("Max-Age=3600"));
    assert!(cookie.contains("Path=/"));

    let session_id = cookie_value(&resp, SESSION_COOKIE).unwrap();
    assert_eq!(state.sessions().len(), 1);

    // Logged in
    let me = server
        .get("/auth/me")
        .add_header(header::COOKIE, cookie_header(SESSION_COOKIE, &session_id))
        .await;
    assert_eq!(me.status_code(), StatusCode::OK);
    let body: UserResponse = me.json();
    let user = body.user.unwrap();
    assert_eq!(user.name, "Ada Lovelace");
    assert_eq!(user.email, "ada@example.com");
    assert_eq!(user.picture.as_deref(), Some("https://example.com/ada.png"));
    assert!(body.error.is_none());

    // Logout
    let out = server
        .post("/auth/logout")
        .add_header(header::COOKIE, cookie_header(SESSION_COOKIE, &session_id))
        .await;
    assert_eq!(out.status_code(), StatusCode::OK);
    let body: Value = out.json();
    assert_eq!(body["message"], "Logged out successfully");

    let cleared = set_cookie(&out, SESSION_COOKIE).unwrap();
    assert!(cleared.contains("Max-Age=0"), "cookie was: {cleared}");
    assert!(state.sessions().is_empty());

    // Same cookie is no longer valid
    let me = server
        .get("/auth/me")
        .add_header(header::COOKIE, cookie_header(SESSION_COOKIE, &session_id))
        .await;
    let body: UserResponse = me.json();
    assert!(body.user.is_none());
    assert_eq!(body.error.as_deref(), Some("Not logged in"));
}

#[tokio::test]
async fn test_me_without_cookie_or_with_unknown_session() {
    let (_, server) = test_app(configured_app(), ScriptedGenerator::new(vec![]));

    let resp = server.get("/auth/me").await;
    assert_eq!(resp.status_code(), StatusCode::OK);
    let body: Value = resp.json();
    assert!(body["user"].is_null());
    assert_eq!(body["error"], "Not logged in");

    let resp = server
        .get("/auth/me")
        .add_header(header::COOKIE, cookie_header(SESSION_COOKIE, "no-such-session"))
        .await;
    assert_eq!(resp.status_code(), StatusCode::OK);
    let body: UserResponse = resp.json();
    assert!(body.user.is_none());
}

#[tokio::test]
async fn test_logout_is_idempotent() {
    let (_, server) = test_app(configured_app(), ScriptedGenerator::new(vec![]));

    for _ in 0..2 {
        let resp = server.post("/auth/logout").await;
        assert_eq!(resp.status_code(), StatusCode::OK);
    }

    let resp = server
        .post("/auth/logout")
        .add_header(header::COOKIE, cookie_header(SESSION_COOKIE, "stale"))
        .await;
    assert_eq!(resp.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_index_lists_endpoints() {
    let (_, server) = test_app(configured_app(), ScriptedGenerator::new(vec![]));

    let resp = server.get("/").await;
    assert_eq!(resp.status_code(), StatusCode::OK);
    let body: Value = resp.json();
    assert_eq!(body["endpoints"]["login"], "/login");
    assert_eq!(body["endpoints"]["chat"], "/chat");
    assert_eq!(body["endpoints"]["reset_chat"], "/chat/reset");

    let html = server
        .get("/")
        .add_header(
            header::ACCEPT,
            axum::http::HeaderValue::from_static("text/html,application/xhtml+xml"),
        )
        .await;
    assert_eq!(html.status_code(), StatusCode::OK);
    assert!(html.text().contains(r#"<a href="/login">Login with Google</a>"#));
}

#[tokio::test]
async fn test_cors_preflight_allows_frontend_origin() {
    let (_, server) = test_app(configured_app(), ScriptedGenerator::new(vec![]));

    let resp = server
        .method(axum::http::Method::OPTIONS, "/chat")
        .add_header(
            header::ORIGIN,
            axum::http::HeaderValue::from_static("http://localhost:5173"),
        )
        .add_header(
            header::ACCESS_CONTROL_REQUEST_METHOD,
            axum::http::HeaderValue::from_static("POST"),
        )
        .add_header(
            header::ACCESS_CONTROL_REQUEST_HEADERS,
            axum::http::HeaderValue::from_static("content-type"),
        )
        .await;

    assert_eq!(
        resp.header(header::ACCESS_CONTROL_ALLOW_ORIGIN),
        "http://localhost:5173"
    );
    assert_eq!(resp.header(header::ACCESS_CONTROL_ALLOW_CREDENTIALS), "true");

    let other = server
        .method(axum::http::Method::OPTIONS, "/chat")
        .add_header(
            header::ORIGIN,
            axum::http::HeaderValue::from_static("https://evil.example"),
        )
        .add_header(
            header::ACCESS_CONTROL_REQUEST_METHOD,
            axum::http::HeaderValue::from_static("POST"),
        )
        .await;
    assert!(
        other
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none()
    );
}
