//! In-memory session storage with time-aware entries.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Profile of an authenticated user, as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub picture: Option<String>,
}

/// Errors raised by the session store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A session with this identifier already exists.
    #[error("Session id already in use: {0}")]
    Duplicate(String),
}

/// A single login session.
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    user: UserProfile,
    created_at: DateTime<Utc>,
    /// `None` when the configured lifetime does not fit in a timestamp.
    expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Get the session ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn user(&self) -> &UserProfile {
        &self.user
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Check whether the session has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Thread-safe store for login sessions.
///
/// Cloning the store shares the underlying map. Expired entries are evicted
/// lazily on lookup and in bulk by [`SessionStore::cleanup_expired`].
#[derive(Debug, Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

#[derive(Debug)]
struct SessionStoreInner {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: Duration,
}

impl SessionStore {
    /// Create an empty store whose sessions live for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(SessionStoreInner {
                sessions: RwLock::new(HashMap::new()),
                ttl,
            }),
        }
    }

    /// Lifetime given to new sessions.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// Create a session for `user` under a fresh random identifier.
    pub fn create(&self, user: UserProfile) -> Result<Session, StoreError> {
        self.create_with_id(Uuid::new_v4().to_string(), user)
    }

    /// Create a session under a caller-chosen identifier.
    pub fn create_with_id(
        &self,
        id: impl Into<String>,
        user: UserProfile,
    ) -> Result<Session, StoreError> {
        let id = id.into();
        let now = Utc::now();
        let expires_at = chrono::Duration::from_std(self.inner.ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl));

        let session = Session {
            id: id.clone(),
            user,
            created_at: now,
            expires_at,
        };

        let mut guard = self
            .inner
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if guard.contains_key(&id) {
            return Err(StoreError::Duplicate(id));
        }
        guard.insert(id, session.clone());
        Ok(session)
    }

    /// Get the session for `id`, if it exists and has not expired.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Session> {
        let now = Utc::now();
        {
            let guard = self
                .inner
                .sessions
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            match guard.get(id) {
                None => return None,
                Some(session) if !session.is_expired_at(now) => return Some(session.clone()),
                Some(_) => {}
            }
        }

        // Expired: evict under the write lock, re-checking in case it was replaced.
        let mut guard = self
            .inner
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if guard.get(id).is_some_and(|s| s.is_expired_at(now)) {
            guard.remove(id);
            tracing::debug!(session_id = %id, "Evicted expired session");
        }
        None
    }

    /// Look up the profile behind a session identifier.
    #[must_use]
    pub fn lookup(&self, id: &str) -> Option<UserProfile> {
        self.get(id).map(|s| s.user)
    }

    /// Delete a session. Deleting an unknown id is a no-op.
    pub fn delete(&self, id: &str) {
        let mut guard = self
            .inner
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        guard.remove(id);
    }

    /// Remove all expired sessions.
    ///
    /// Returns the number of sessions removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = Utc::now();
        let mut guard = self
            .inner
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = guard.len();
        guard.retain(|_, session| !session.is_expired_at(now));
        before - guard.len()
    }

    /// Number of stored sessions, including expired ones not yet evicted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
