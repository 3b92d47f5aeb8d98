//! Identity provider abstraction and the Google implementation.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::OAuthConfig;
use crate::session::UserProfile;

use super::{AuthError, OAuthCredentials};

/// Bearer credential returned by the token endpoint.
///
/// The value never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for use in an `Authorization` header.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Server-to-server half of the authorization-code flow.
///
/// Implementations perform the two provider calls that follow the browser
/// redirect: the code exchange and the profile fetch.
#[async_trait]
pub trait IdentityProvider: Send + Sync + std::fmt::Debug {
    /// Exchange an authorization code for an access token.
    ///
    /// # Errors
    ///
    /// [`AuthError::TokenExchange`] when the provider answers without a token,
    /// [`AuthError::AuthFailed`] on network or parse failures.
    async fn exchange_code(
        &self,
        credentials: &OAuthCredentials,
        code: &str,
    ) -> Result<AccessToken, AuthError>;

    /// Fetch the profile of the user the token was issued for.
    async fn fetch_user_info(&self, token: &AccessToken) -> Result<UserProfile, AuthError>;
}

/// Token endpoint response. Errors come back in the same shape.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Subset of the user-info document we keep.
#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

impl From<UserInfoResponse> for UserProfile {
    fn from(info: UserInfoResponse) -> Self {
        Self {
            name: info.name.unwrap_or_default(),
            email: info.email.unwrap_or_default(),
            picture: info.picture.filter(|p| !p.is_empty()),
        }
    }
}

/// Google OAuth2 endpoints over `reqwest`.
#[derive(Clone)]
pub struct GoogleProvider {
    http: reqwest::Client,
    token_url: String,
    userinfo_url: String,
}

impl std::fmt::Debug for GoogleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleProvider")
            .field("token_url", &self.token_url)
            .field("userinfo_url", &self.userinfo_url)
            .finish()
    }
}

impl GoogleProvider {
    /// Create a provider client. Every call is bounded by
    /// `provider_timeout_secs`.
    pub fn new(config: &OAuthConfig) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.provider_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            token_url: config.token_url.clone(),
            userinfo_url: config.userinfo_url.clone(),
        })
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    async fn exchange_code(
        &self,
        credentials: &OAuthCredentials,
        code: &str,
    ) -> Result<AccessToken, AuthError> {
        let form = [
            ("code", code),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret()),
            ("redirect_uri", credentials.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];

        let resp = self
            .http
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| AuthError::AuthFailed(e.to_string()))?;
        let status = resp.status();

        // Google reports grant errors as JSON bodies on 4xx, so parse first.
        let body: TokenResponse = resp
            .json()
            .await
            .map_err(|e| AuthError::AuthFailed(format!("token endpoint returned {status}: {e}")))?;

        match body.access_token.filter(|t| !t.is_empty()) {
            Some(token) => {
                tracing::debug!(status = %status, "Authorization code exchanged");
                Ok(AccessToken::new(token))
            }
            None => {
                let reason = match (body.error, body.error_description) {
                    (Some(err), Some(desc)) => format!("{err}: {desc}"),
                    (Some(err), None) => err,
                    (None, Some(desc)) => desc,
                    (None, None) => format!("no access_token in {status} response"),
                };
                Err(AuthError::TokenExchange(reason))
            }
        }
    }

    async fn fetch_user_info(&self, token: &AccessToken) -> Result<UserProfile, AuthError> {
        let info: UserInfoResponse = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(token.secret())
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| AuthError::AuthFailed(e.to_string()))?
            .json()
            .await
            .map_err(|e| AuthError::AuthFailed(e.to_string()))?;

        Ok(info.into())
    }
}
