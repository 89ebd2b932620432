use super::{SessionData, SessionError, SessionStore, StoreHealth};
use anyhow::anyhow;
use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
    time::{Duration, Instant},
};

/// Process-local store for tests and single-replica development runs.
#[derive(Debug)]
pub struct MemorySessionStore {
    ttl: Duration,
    sessions: Mutex<HashMap<String, (SessionData, Instant)>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, (SessionData, Instant)>>, SessionError> {
        self.sessions
            .lock()
            .map_err(|_| SessionError::Backend(anyhow!("session map lock poisoned")))
    }

    /// Number of stored sessions, expired ones included.
    ///
    /// # Errors
    /// Returns an error if the lock is poisoned.
    pub fn len(&self) -> Result<usize, SessionError> {
        Ok(self.lock()?.len())
    }

    /// # Errors
    /// Returns an error if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, SessionError> {
        Ok(self.lock()?.is_empty())
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new(super::DEFAULT_SESSION_TTL)
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn save(&self, request_id: &str, data: &SessionData) -> Result<(), SessionError> {
        let expires_at = Instant::now() + self.ttl;
        self.lock()?
            .insert(request_id.to_string(), (data.clone(), expires_at));
        Ok(())
    }

    async fn get(&self, request_id: &str) -> Result<SessionData, SessionError> {
        let mut sessions = self.lock()?;
        match sessions.get(request_id) {
            Some((_, expires_at)) if Instant::now() >= *expires_at => {
                sessions.remove(request_id);
                Err(SessionError::NotFound)
            }
            Some((data, _)) => Ok(data.clone()),
            None => Err(SessionError::NotFound),
        }
    }

    async fn delete(&self, request_id: &str) -> Result<(), SessionError> {
        self.lock()?.remove(request_id);
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, SessionError> {
        let now = Instant::now();
        let mut sessions = self.lock()?;
        let before = sessions.len();
        sessions.retain(|_, (_, expires_at)| now < *expires_at);
        Ok(u64::try_from(before - sessions.len()).unwrap_or(u64::MAX))
    }

    async fn health(&self) -> StoreHealth {
        if self.sessions.is_poisoned() {
            StoreHealth::Error
        } else {
            StoreHealth::Ok
        }
    }
}
