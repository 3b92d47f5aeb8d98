//! The three-leg authorization-code flow.

use std::sync::Arc;

use axum_extra::extract::cookie::{Cookie, SameSite};
use url::Url;

use crate::config::OAuthConfig;
use crate::session::{Session, SessionStore, UserProfile};

use super::{AuthError, IdentityProvider};

/// Name of the cookie carrying the session identifier.
pub const SESSION_COOKIE: &str = "session_id";

/// Scopes requested at the consent screen.
const SCOPES: &str = "openid email profile";

/// Resolved client credentials.
#[derive(Clone)]
pub struct OAuthCredentials {
    pub client_id: String,
    client_secret: String,
    pub redirect_uri: String,
}

impl OAuthCredentials {
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
        }
    }

    #[must_use]
    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    /// Resolve credentials from configuration.
    ///
    /// # Errors
    ///
    /// [`AuthError::Config`] naming every missing variable.
    pub fn from_config(config: &OAuthConfig) -> Result<Self, AuthError> {
        let client_id = present(&config.client_id);
        let client_secret = present(&config.client_secret);
        let redirect_uri = present(&config.redirect_uri);

        match (client_id, client_secret, redirect_uri) {
            (Some(id), Some(secret), Some(uri)) => Ok(Self::new(id, secret, uri)),
            _ => {
                let missing: Vec<&str> = [
                    ("GOOGLE_CLIENT_ID", client_id),
                    ("GOOGLE_CLIENT_SECRET", client_secret),
                    ("GOOGLE_REDIRECT_URI", redirect_uri),
                ]
                .iter()
                .filter(|(_, v)| v.is_none())
                .map(|(name, _)| *name)
                .collect();
                Err(AuthError::Config(missing.join(", ")))
            }
        }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

impl std::fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("client_id", &self.client_id)
            .field("redirect_uri", &self.redirect_uri)
            .finish_non_exhaustive()
    }
}

/// Orchestrates login, callback, profile lookup and logout.
///
/// Credentials are resolved on every call so that a server started without
/// them keeps serving everything except the login endpoints.
#[derive(Debug, Clone)]
pub struct OAuthFlow {
    config: OAuthConfig,
    provider: Arc<dyn IdentityProvider>,
    sessions: SessionStore,
}

impl OAuthFlow {
    #[must_use]
    pub fn new(
        config: OAuthConfig,
        provider: Arc<dyn IdentityProvider>,
        sessions: SessionStore,
    ) -> Self {
        Self {
            config,
            provider,
            sessions,
        }
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Where the browser is sent after a successful callback.
    #[must_use]
    pub fn frontend_url(&self) -> &str {
        &self.config.frontend_url
    }

    /// Build the provider authorization URL.
    pub fn begin_login(&self) -> Result<Url, AuthError> {
        let credentials = OAuthCredentials::from_config(&self.config)?;

        Url::parse_with_params(
            &self.config.auth_url,
            &[
                ("client_id", credentials.client_id.as_str()),
                ("redirect_uri", credentials.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", SCOPES),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )
        .map_err(|e| AuthError::Config(format!("a valid auth_url ({e})")))
    }

    /// Complete the flow for an authorization code and open a session.
    pub async fn handle_callback(&self, code: Option<&str>) -> Result<Session, AuthError> {
        let credentials = OAuthCredentials::from_config(&self.config)?;
        let code = code
            .filter(|c| !c.is_empty())
            .ok_or(AuthError::MissingCode)?;

        let token = self.provider.exchange_code(&credentials, code).await?;
        let user = self.provider.fetch_user_info(&token).await?;
        let session = self.sessions.create(user)?;

        tracing::info!(
            name: "auth.session.created",
            session_id = %session.id(),
            email = %session.user().email,
            "User logged in"
        );
        Ok(session)
    }

    /// Profile behind the cookie, or `None` when not logged in.
    #[must_use]
    pub fn current_user(&self, session_id: Option<&str>) -> Option<UserProfile> {
        session_id.and_then(|id| self.sessions.lookup(id))
    }

    /// End the session, if any.
    pub fn logout(&self, session_id: Option<&str>) {
        if let Some(id) = session_id {
            self.sessions.delete(id);
            tracing::info!(name: "auth.session.deleted", session_id = %id, "User logged out");
        }
    }

    /// Cookie handing the session id to the browser.
    #[must_use]
    pub fn session_cookie(&self, session: &Session) -> Cookie<'static> {
        let max_age = i64::try_from(self.sessions.ttl().as_secs()).unwrap_or(i64::MAX);
        Cookie::build((SESSION_COOKIE, session.id().to_string()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::seconds(max_age))
            .build()
    }
}

/// Cookie template used to clear the session cookie; the jar turns it into
/// an expired `Set-Cookie`.
#[must_use]
pub fn cleared_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, "")).path("/").build()
}
