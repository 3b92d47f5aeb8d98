//! Shared fixtures: an in-process identity provider, a scripted text
//! generator and a router wired to both.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::http::{HeaderValue, header};
use axum_test::{TestResponse, TestServer};

use oauth_chat_server::AppState;
use oauth_chat_server::auth::{AccessToken, AuthError, IdentityProvider, OAuthCredentials};
use oauth_chat_server::chat::{ChatError, SamplingParams, TextGenerator};
use oauth_chat_server::config::{AppConfig, OAuthConfig};
use oauth_chat_server::server::build_router;
use oauth_chat_server::session::UserProfile;

/// Authorization code the fake provider accepts.
pub const GOOD_CODE: &str = "4/good-code";

/// Accepts [`GOOD_CODE`] and returns a fixed profile.
#[derive(Debug)]
pub struct FakeProvider {
    pub user: UserProfile,
}

impl Default for FakeProvider {
    fn default() -> Self {
        Self {
            user: UserProfile {
                name: "Ada Lovelace".to_string(),
                email: "ada@example.com".to_string(),
                picture: Some("https://example.com/ada.png".to_string()),
            },
        }
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    async fn exchange_code(
        &self,
        _credentials: &OAuthCredentials,
        code: &str,
    ) -> Result<AccessToken, AuthError> {
        if code == GOOD_CODE {
            Ok(AccessToken::new("fake-access-token"))
        } else {
            Err(AuthError::TokenExchange(
                "invalid_grant: Malformed auth code.".to_string(),
            ))
        }
    }

    async fn fetch_user_info(&self, _token: &AccessToken) -> Result<UserProfile, AuthError> {
        Ok(self.user.clone())
    }
}

/// Replays queued generations, then answers with a default reply.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String, ChatError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(replies: Vec<Result<String, ChatError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::default(),
        })
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str, _params: &SamplingParams) -> Result<String, ChatError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("Hello! How can I help you today?".to_string()))
    }
}

pub fn configured_oauth() -> OAuthConfig {
    OAuthConfig {
        client_id: Some("test-client-id".to_string()),
        client_secret: Some("test-client-secret".to_string()),
        redirect_uri: Some("http://localhost:8000/auth/callback".to_string()),
        ..OAuthConfig::default()
    }
}

pub fn configured_app() -> AppConfig {
    AppConfig {
        oauth: configured_oauth(),
        ..AppConfig::default()
    }
}

/// Build the application state and a test server over the real router.
pub fn test_app(config: AppConfig, generator: Arc<ScriptedGenerator>) -> (AppState, TestServer) {
    let state = AppState::new(
        Arc::new(config),
        Arc::new(FakeProvider::default()),
        generator,
    );
    let server = TestServer::new(build_router(state.clone())).unwrap();
    (state, server)
}

/// All `Set-Cookie` headers of a response.
pub fn set_cookies(response: &TestResponse) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok().map(str::to_string))
        .collect()
}

/// The `Set-Cookie` header for `name`, if any.
pub fn set_cookie(response: &TestResponse, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    set_cookies(response)
        .into_iter()
        .find(|c| c.starts_with(&prefix))
}

/// Value of the `name` cookie set by a response.
pub fn cookie_value(response: &TestResponse, name: &str) -> Option<String> {
    set_cookie(response, name).map(|c| {
        c.split(';')
            .next()
            .unwrap_or_default()
            .trim_start_matches(&format!("{name}="))
            .to_string()
    })
}

/// A `Cookie` request header value.
pub fn cookie_header(name: &str, value: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("{name}={value}")).unwrap()
}
