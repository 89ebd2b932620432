use super::{SessionData, SessionError, SessionStore, StoreHealth};
use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, Connection, PgPool};
use std::time::Duration;
use tracing::{debug, error, info_span, Instrument};

const SCHEMA: &str = include_str!("../../sql/schema.sql");

/// Connection pool sizing.
#[derive(Debug, Clone, Copy)]
pub struct PgPoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub max_lifetime: Duration,
}

impl Default for PgPoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 25,
            min_connections: 5,
            max_lifetime: Duration::from_secs(5 * 60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PgSessionStore {
    pool: PgPool,
    ttl: Duration,
}

impl PgSessionStore {
    #[must_use]
    pub fn new(pool: PgPool, ttl: Duration) -> Self {
        Self { pool, ttl }
    }

    /// Connect, verify the connection and apply the session schema.
    ///
    /// # Errors
    /// Returns an error if the database is unreachable or the schema cannot be applied.
    pub async fn connect(dsn: &str, pool_config: PgPoolConfig, ttl: Duration) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(pool_config.min_connections)
            .max_connections(pool_config.max_connections)
            .max_lifetime(pool_config.max_lifetime)
            .test_before_acquire(true)
            .connect(dsn)
            .await
            .context("Failed to connect to database")?;

        let store = Self::new(pool, ttl);
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Apply `sql/schema.sql`. Idempotent.
    ///
    /// # Errors
    /// Returns an error if the DDL fails.
    pub async fn ensure_schema(&self) -> anyhow::Result<()> {
        let span = info_span!("db.query", db.system = "postgresql", db.operation = "DDL");
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("Failed to apply session schema")?;
        Ok(())
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn save(&self, request_id: &str, data: &SessionData) -> Result<(), SessionError> {
        let payload = serde_json::to_string(data).context("Failed to serialize session data")?;

        let query = r"
            INSERT INTO hook_sessions (request_id, session_data, expires_at)
            VALUES ($1, $2::jsonb, NOW() + make_interval(secs => $3))
            ON CONFLICT (request_id) DO UPDATE
            SET session_data = EXCLUDED.session_data,
                expires_at = EXCLUDED.expires_at,
                updated_at = NOW()
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(request_id)
            .bind(payload)
            .bind(self.ttl.as_secs_f64())
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("Failed to save session")?;

        debug!("Session {request_id} saved");
        Ok(())
    }

    async fn get(&self, request_id: &str) -> Result<SessionData, SessionError> {
        let query = r"
            SELECT session_data::text, expires_at < NOW()
            FROM hook_sessions
            WHERE request_id = $1
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row: Option<(String, bool)> = sqlx::query_as(query)
            .bind(request_id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("Failed to retrieve session")?;

        let Some((payload, expired)) = row else {
            return Err(SessionError::NotFound);
        };

        if expired {
            debug!("Session {request_id} expired");
            self.delete(request_id).await?;
            return Err(SessionError::NotFound);
        }

        let data = serde_json::from_str(&payload).context("Failed to decode session data")?;
        Ok(data)
    }

    async fn delete(&self, request_id: &str) -> Result<(), SessionError> {
        let query = "DELETE FROM hook_sessions WHERE request_id = $1";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(request_id)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, SessionError> {
        let query = "DELETE FROM hook_sessions WHERE expires_at < NOW()";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("Failed to purge expired sessions")?;
        Ok(result.rows_affected())
    }

    async fn health(&self) -> StoreHealth {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        match self.pool.acquire().instrument(acquire_span).await {
            Ok(mut conn) => {
                let ping_span =
                    info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
                match conn.ping().instrument(ping_span).await {
                    Ok(()) => StoreHealth::Ok,
                    Err(err) => {
                        error!("Failed to ping database: {err}");
                        StoreHealth::Error
                    }
                }
            }
            Err(err) => {
                error!("Failed to acquire database connection: {err}");
                StoreHealth::Error
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_defaults() {
        let config = PgPoolConfig::default();
        assert_eq!(config.max_connections, 25);
        assert_eq!(config.min_connections, 5);
        assert_eq!(config.max_lifetime, Duration::from_secs(300));
    }

    #[test]
    fn schema_is_idempotent_ddl() {
        assert!(SCHEMA.contains("CREATE TABLE IF NOT EXISTS hook_sessions"));
        assert!(SCHEMA.contains("CREATE INDEX IF NOT EXISTS"));
    }
}
