//! Per-browser session storage.
//!
//! Every browser is identified by an opaque session token carried in a
//! cookie. The token maps to a [`SessionData`] record holding the browser's
//! to-do lists and its pending flash messages.
//!
//! # Architecture
//!
//! Handlers only see the [`SessionStore`] trait, a plain get/set interface,
//! so the backing storage can be swapped for a cookie or an external cache.
//! [`MemorySessionStore`] is the in-process implementation: a map guarded by
//! a [`RwLock`], with a sliding idle TTL and a capacity limit.
//!
//! Each request works on a snapshot: it reads the record, mutates it, and
//! writes it back. Concurrent requests against the same session are
//! last-writer-wins.
//!
//! # Token Format
//!
//! Session tokens are 32 bytes of cryptographically secure random data,
//! base64-url encoded without padding, resulting in 43 character tokens.
//! Tokens are never written to the log.
//!
//! # Example
//!
//! ```rust
//! use todo_lists_server::session::{
//!     generate_session_token, MemorySessionStore, SessionStore, SessionStoreConfig,
//! };
//! use todo_lists_server::types::SessionData;
//!
//! let store = MemorySessionStore::new(SessionStoreConfig::default());
//! let token = generate_session_token();
//!
//! store.set(&token, SessionData::default()).expect("store has capacity");
//! assert!(store.get(&token).is_some());
//! ```

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::types::SessionData;

/// Default idle lifetime of a session (one day).
pub const DEFAULT_TTL_SECS: u64 = 86_400;

/// Default maximum number of sessions.
pub const DEFAULT_MAX_CAPACITY: usize = 10_000;

/// Size of the random token in bytes.
const TOKEN_BYTES: usize = 32;

/// Length of a base64-url encoded token.
pub const TOKEN_LENGTH: usize = 43;

/// Errors that can occur when writing a session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The session store has reached maximum capacity.
    #[error("session store at maximum capacity ({max_capacity} sessions)")]
    AtCapacity {
        /// The maximum number of sessions allowed.
        max_capacity: usize,
    },
}

/// Storage backend for session records.
///
/// Implementations must be shareable across request tasks.
pub trait SessionStore: Send + Sync {
    /// Returns the record for `token`, or `None` if it is unknown or expired.
    fn get(&self, token: &str) -> Option<SessionData>;

    /// Stores `data` under `token`, replacing any previous record.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AtCapacity`] if `token` is new and the store
    /// cannot accept another session.
    fn set(&self, token: &str, data: SessionData) -> Result<(), SessionError>;

    /// Removes the record for `token`, returning it if it existed.
    fn remove(&self, token: &str) -> Option<SessionData>;

    /// Number of records currently held.
    fn len(&self) -> usize;

    /// Returns true if the store holds no records.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Configuration for [`MemorySessionStore`].
#[derive(Debug, Clone)]
pub struct SessionStoreConfig {
    /// Maximum number of concurrent sessions.
    pub max_capacity: usize,

    /// Idle time after which a session expires. Refreshed on every write.
    pub ttl: Duration,
}

impl Default for SessionStoreConfig {
    fn default() -> Self {
        Self {
            max_capacity: DEFAULT_MAX_CAPACITY,
            ttl: Duration::from_secs(DEFAULT_TTL_SECS),
        }
    }
}

impl SessionStoreConfig {
    /// Creates a new configuration with custom values.
    pub fn new(max_capacity: usize, ttl: Duration) -> Self {
        Self { max_capacity, ttl }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    data: SessionData,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Thread-safe in-memory session store.
///
/// Cloning is cheap and yields a handle to the same map.
#[derive(Clone)]
pub struct MemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, Entry>>>,
    config: SessionStoreConfig,
}

impl MemorySessionStore {
    /// Creates a new session store with the given configuration.
    ///
    /// # Example
    ///
    /// ```rust
    /// use todo_lists_server::session::{MemorySessionStore, SessionStore, SessionStoreConfig};
    /// use std::time::Duration;
    ///
    /// let store = MemorySessionStore::new(SessionStoreConfig::new(
    ///     1000,
    ///     Duration::from_secs(3600),
    /// ));
    /// assert!(store.is_empty());
    /// ```
    pub fn new(config: SessionStoreConfig) -> Self {
        debug!(
            max_capacity = config.max_capacity,
            ttl_secs = config.ttl.as_secs(),
            "Creating new session store"
        );
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    /// Removes all expired sessions from the store.
    ///
    /// Complements the lazy removal performed by [`SessionStore::get`].
    ///
    /// # Returns
    ///
    /// The number of sessions that were removed.
    pub fn cleanup_expired(&self) -> usize {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let initial_len = sessions.len();

        sessions.retain(|_, entry| !entry.is_expired());

        let removed = initial_len - sessions.len();
        if removed > 0 {
            debug!(
                removed_count = removed,
                remaining_count = sessions.len(),
                "Cleaned up expired sessions"
            );
        }

        removed
    }

    /// Spawns a background task that calls [`cleanup_expired`](Self::cleanup_expired)
    /// every `cleanup_interval`.
    ///
    /// The returned handle should be aborted on shutdown.
    pub fn spawn_cleanup_task(&self, cleanup_interval: Duration) -> tokio::task::JoinHandle<()> {
        let store = self.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(cleanup_interval);

            loop {
                interval.tick().await;
                store.cleanup_expired();
            }
        })
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, token: &str) -> Option<SessionData> {
        if token.len() != TOKEN_LENGTH {
            trace!(token_len = token.len(), "Invalid token length");
            return None;
        }

        {
            let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
            match sessions.get(token) {
                Some(entry) if !entry.is_expired() => {
                    trace!(list_count = entry.data.lists.len(), "Session loaded");
                    return Some(entry.data.clone());
                }
                Some(_) => {}
                None => {
                    trace!("Session token not found");
                    return None;
                }
            }
        }

        // Present but expired: drop it now rather than waiting for the sweep.
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        if sessions.get(token).is_some_and(Entry::is_expired) {
            sessions.remove(token);
            trace!("Removed expired session during lookup");
        }

        None
    }

    fn set(&self, token: &str, data: SessionData) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);

        if !sessions.contains_key(token) && sessions.len() >= self.config.max_capacity {
            // Reclaim expired slots before refusing.
            sessions.retain(|_, entry| !entry.is_expired());

            if sessions.len() >= self.config.max_capacity {
                warn!(
                    capacity = sessions.len(),
                    max_capacity = self.config.max_capacity,
                    "Session store at capacity, rejecting new session"
                );
                return Err(SessionError::AtCapacity {
                    max_capacity: self.config.max_capacity,
                });
            }
        }

        trace!(list_count = data.lists.len(), "Session saved");
        sessions.insert(
            token.to_string(),
            Entry {
                data,
                expires_at: Instant::now() + self.config.ttl,
            },
        );

        Ok(())
    }

    fn remove(&self, token: &str) -> Option<SessionData> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let removed = sessions.remove(token).map(|entry| entry.data);

        if removed.is_some() {
            trace!("Session removed");
        }

        removed
    }

    fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new(SessionStoreConfig::default())
    }
}

impl std::fmt::Debug for MemorySessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let len = self.sessions.read().map(|s| s.len()).unwrap_or(0);
        f.debug_struct("MemorySessionStore")
            .field("session_count", &len)
            .field("config", &self.config)
            .finish()
    }
}

/// Generates a cryptographically secure session token.
///
/// The token is 32 bytes of random data, base64-url encoded without
/// padding, resulting in a 43-character string.
pub fn generate_session_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
