//! In-memory session store.
//!
//! A session is created on login and identified by a random token. Tokens
//! reach the store only after the signed cookie jar has verified them.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use rand::RngCore;

/// Result of checking a request's session cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Anonymous,
    Authenticated(String),
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    pub fn username(&self) -> Option<&str> {
        match self {
            Self::Authenticated(username) => Some(username),
            Self::Anonymous => None,
        }
    }
}

#[derive(Debug, Clone)]
struct SessionEntry {
    username: String,
    expires_at: Instant,
}

/// Thread-safe session store.
pub struct SessionStore {
    /// Map of token to session.
    sessions: DashMap<String, SessionEntry>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    /// Start a session for `username` and return its token.
    pub fn create(&self, username: &str) -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = hex::encode(bytes);

        self.sessions.insert(
            token.clone(),
            SessionEntry {
                username: username.to_string(),
                expires_at: Instant::now() + self.ttl,
            },
        );
        tracing::debug!(username, "session created");

        token
    }

    /// Look up a session token. Expired sessions are dropped on sight.
    pub fn authorize(&self, token: Option<&str>) -> AuthState {
        let Some(token) = token else {
            return AuthState::Anonymous;
        };

        let now = Instant::now();
        if self
            .sessions
            .remove_if(token, |_, entry| entry.expires_at <= now)
            .is_some()
        {
            return AuthState::Anonymous;
        }

        match self.sessions.get(token) {
            Some(entry) => AuthState::Authenticated(entry.username.clone()),
            None => AuthState::Anonymous,
        }
    }

    /// End the session named by `token`. Returns whether one existed.
    pub fn logout(&self, token: Option<&str>) -> bool {
        token.is_some_and(|token| self.sessions.remove(token).is_some())
    }

    /// End every session of `username` except the one named by `keep`.
    pub fn revoke_others(&self, username: &str, keep: Option<&str>) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|token, entry| entry.username != username || Some(token.as_str()) == keep);
        before.saturating_sub(self.sessions.len())
    }

    /// Drop every expired session. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, entry| entry.expires_at > now);
        before.saturating_sub(self.sessions.len())
    }

    /// Number of live or not yet purged sessions.
    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    /// Starts a background task that periodically purges expired sessions.
    pub fn start_cleanup_task(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let purged = store.purge_expired();
                if purged > 0 {
                    tracing::info!(purged, "Purged expired sessions");
                }
            }
        })
    }
}
