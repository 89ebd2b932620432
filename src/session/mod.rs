//! Persistence of in-flight authentication flows between auth-hook steps.
//!
//! Sessions are keyed by the SFTPGo request identifier and expire after a
//! retention window. Reads treat expired rows as absent and delete them; the
//! optional sweeper only keeps the table small.

mod memory;
mod postgres;

pub use self::memory::MemorySessionStore;
pub use self::postgres::{PgPoolConfig, PgSessionStore};

use crate::idp::NextStep;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Default retention window of a session.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(15 * 60);

/// Flow continuation state stored between steps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub flow_id: String,
    #[serde(default)]
    pub next_step: Option<NextStep>,
}

impl SessionData {
    /// The stored step still offers something to answer.
    #[must_use]
    pub fn is_resumable(&self) -> bool {
        self.next_step
            .as_ref()
            .is_some_and(NextStep::has_authenticators)
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found or expired")]
    NotFound,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreHealth {
    Ok,
    Error,
    Disabled,
}

impl StoreHealth {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
            Self::Disabled => "disabled",
        }
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert or replace the session for `request_id`, restarting its retention window.
    async fn save(&self, request_id: &str, data: &SessionData) -> Result<(), SessionError>;

    /// # Errors
    /// [`SessionError::NotFound`] if the session is absent or expired.
    async fn get(&self, request_id: &str) -> Result<SessionData, SessionError>;

    async fn delete(&self, request_id: &str) -> Result<(), SessionError>;

    /// Remove every expired session, returning how many were removed.
    async fn purge_expired(&self) -> Result<u64, SessionError>;

    async fn health(&self) -> StoreHealth;
}

/// Store used when no database is configured. Writes are dropped and every
/// read is a miss, so multi-step logins cannot complete.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledSessionStore;

#[async_trait]
impl SessionStore for DisabledSessionStore {
    async fn save(&self, request_id: &str, _data: &SessionData) -> Result<(), SessionError> {
        warn!("Session store not configured, cannot save session {request_id}");
        Ok(())
    }

    async fn get(&self, request_id: &str) -> Result<SessionData, SessionError> {
        warn!("Session store not configured, cannot get session {request_id}");
        Err(SessionError::NotFound)
    }

    async fn delete(&self, _request_id: &str) -> Result<(), SessionError> {
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, SessionError> {
        Ok(0)
    }

    async fn health(&self) -> StoreHealth {
        StoreHealth::Disabled
    }
}

/// Periodically purge expired sessions until the runtime shuts down.
pub fn spawn_sweeper(store: Arc<dyn SessionStore>, interval: Duration) {
    if interval.is_zero() {
        info!("Session sweeper disabled");
        return;
    }

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match store.purge_expired().await {
                Ok(0) => {}
                Ok(removed) => debug!("Purged {removed} expired sessions"),
                Err(err) => error!("Failed to purge expired sessions: {err}"),
            }
        }
    });
}
