//! Third-party OAuth2 login.
//!
//! Implements the authorization-code flow against an identity provider
//! (Google by default):
//!
//! 1. `GET /login` redirects the browser to the provider's consent page.
//! 2. `GET /auth/callback` exchanges the returned code for an access token,
//!    fetches the user profile, opens a [`Session`](crate::session::Session)
//!    and sets the `session_id` cookie.
//! 3. `GET /auth/me` and `POST /auth/logout` read and end the session.
//!
//! # Modules
//!
//! - [`error`]: Failure taxonomy and HTTP mapping
//! - [`provider`]: [`IdentityProvider`] trait and the Google implementation
//! - [`oauth`]: [`OAuthFlow`] orchestrating the three legs
//! - [`routes`]: Axum handlers

pub mod error;
pub mod oauth;
pub mod provider;
pub mod routes;

pub use error::AuthError;
pub use oauth::{OAuthCredentials, OAuthFlow, SESSION_COOKIE};
pub use provider::{AccessToken, GoogleProvider, IdentityProvider};
