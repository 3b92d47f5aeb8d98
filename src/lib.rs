//! OAuth Chat Server
//!
//! A small HTTP backend that signs users in with Google OAuth2 and serves a
//! chat endpoint backed by a local text-generation model.
//!
//! # Architecture
//!
//! - **Server**: Axum router with CORS, request timeout and tracing layers
//! - **Auth**: Authorization-code flow against an [`auth::IdentityProvider`]
//! - **Sessions**: In-memory, expiring login sessions keyed by cookie
//! - **Chat**: Prompt construction, generation and reply cleanup per caller
//!
//! # Modules
//!
//! - [`config`]: Layered configuration (file, environment, CLI)
//! - [`auth`]: OAuth flow, provider client and HTTP handlers
//! - [`session`]: Session store
//! - [`chat`]: Chat engine, text generator and HTTP handlers
//! - [`server`]: Router assembly and startup
//! - [`telemetry`]: Logging setup

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::implicit_hasher)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::default_trait_access)]
#![allow(clippy::unused_async)]

pub mod auth;
pub mod chat;
pub mod config;
pub mod server;
pub mod session;
pub mod telemetry;

use std::sync::Arc;
use std::time::Duration;

use crate::auth::{IdentityProvider, OAuthFlow};
use crate::chat::{ChatEngine, TextGenerator};
use crate::config::AppConfig;
use crate::session::SessionStore;

/// Application state shared across all handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Global Configuration
    pub config: Arc<AppConfig>,
    /// Login flow and the session store behind it.
    pub oauth: Arc<OAuthFlow>,
    /// Per-caller conversations.
    pub chat: Arc<ChatEngine>,
}

impl AppState {
    /// Wire the services together from configuration and the two backends.
    #[must_use]
    pub fn new(
        config: Arc<AppConfig>,
        provider: Arc<dyn IdentityProvider>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        let sessions = SessionStore::new(Duration::from_secs(config.session.ttl_secs));
        let oauth = OAuthFlow::new(config.oauth.clone(), provider, sessions);
        let chat = ChatEngine::new(generator, &config.chat);

        Self {
            config,
            oauth: Arc::new(oauth),
            chat: Arc::new(chat),
        }
    }

    /// The session store behind the login flow.
    #[must_use]
    pub fn sessions(&self) -> &SessionStore {
        self.oauth.sessions()
    }
}
