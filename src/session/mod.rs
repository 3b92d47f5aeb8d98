//! Login session management.
//!
//! Sessions map an opaque, unguessable identifier (UUID v4) to the profile of
//! the user who completed the OAuth flow. They live in process memory only.
//!
//! # Architecture
//!
//! - [`UserProfile`]: Identity returned by the provider, immutable once created
//! - [`Session`]: A profile plus its creation and expiry timestamps
//! - [`SessionStore`]: Thread-safe store with lazy and swept expiry
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use oauth_chat_server::session::{SessionStore, UserProfile};
//!
//! let store = SessionStore::new(Duration::from_secs(3600));
//! let user = UserProfile {
//!     name: "Ada".to_string(),
//!     email: "ada@example.com".to_string(),
//!     picture: None,
//! };
//! let session = store.create(user).unwrap();
//!
//! assert_eq!(store.lookup(session.id()).unwrap().name, "Ada");
//! store.delete(session.id());
//! assert!(store.lookup(session.id()).is_none());
//! ```

mod store;

pub use store::{Session, SessionStore, StoreError, UserProfile};
