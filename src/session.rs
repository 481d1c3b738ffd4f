//! Injectable key-value store with TTL semantics for one-time codes and
//! short-lived session state. The OTP flow itself lives outside this crate;
//! deployments are expected to back this trait with an external expiring
//! cache, since process memory neither survives restarts nor spans
//! instances. The in-memory implementation exists for tests and
//! single-process setups.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("Session store backend error: {0}")]
    Backend(String),
}

/// Expiring key-value store for one-time codes.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Stores `value` under `key` for `ttl`, replacing any previous entry.
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), SessionStoreError>;

    /// Removes and returns the value for `key`. Expired entries read as
    /// absent. Consume-once: a second take returns `None`.
    async fn take(&self, key: &str) -> Result<Option<String>, SessionStoreError>;

    /// Drops expired entries, returning how many were removed.
    async fn purge_expired(&self) -> Result<usize, SessionStoreError>;
}

pub struct InMemorySessionStore {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), SessionStoreError> {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }

    async fn take(&self, key: &str) -> Result<Option<String>, SessionStoreError> {
        let mut entries = self.entries.lock().unwrap();
        match entries.remove(key) {
            Some((value, expires_at)) if expires_at > Instant::now() => Ok(Some(value)),
            _ => Ok(None),
        }
    }

    async fn purge_expired(&self) -> Result<usize, SessionStoreError> {
        let mut entries = self.entries.lock().unwrap();
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, (_, expires_at)| *expires_at > now);
        Ok(before - entries.len())
    }
}
