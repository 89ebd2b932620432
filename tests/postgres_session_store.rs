//! Runs against a real database only when `SFTPGO_HOOKS_TEST_DSN` is set.

use anyhow::Result;
use sftpgo_hooks::idp::{Authenticator, NextStep};
use sftpgo_hooks::session::{
    PgPoolConfig, PgSessionStore, SessionData, SessionError, SessionStore, StoreHealth,
};
use std::time::Duration;
use ulid::Ulid;

async fn store(ttl: Duration) -> Result<Option<PgSessionStore>> {
    let Ok(dsn) = std::env::var("SFTPGO_HOOKS_TEST_DSN") else {
        eprintln!("SFTPGO_HOOKS_TEST_DSN not set, skipping");
        return Ok(None);
    };
    let pool = PgPoolConfig {
        max_connections: 2,
        min_connections: 0,
        ..PgPoolConfig::default()
    };
    Ok(Some(PgSessionStore::connect(&dsn, pool, ttl).await?))
}

fn session(flow_id: &str) -> SessionData {
    SessionData {
        flow_id: flow_id.to_string(),
        next_step: Some(NextStep {
            step_type: "AUTHENTICATOR_PROMPT".to_string(),
            authenticators: vec![Authenticator {
                authenticator_id: "basic".to_string(),
                authenticator: "Username & Password".to_string(),
                ..Authenticator::default()
            }],
            messages: Vec::new(),
        }),
    }
}

#[tokio::test]
async fn save_get_replace_delete() -> Result<()> {
    let Some(store) = store(Duration::from_secs(60)).await? else {
        return Ok(());
    };
    let id = Ulid::new().to_string();

    assert!(matches!(store.get(&id).await, Err(SessionError::NotFound)));

    store.save(&id, &session("flow-1")).await?;
    assert_eq!(store.get(&id).await?, session("flow-1"));

    store.save(&id, &session("flow-2")).await?;
    assert_eq!(store.get(&id).await?.flow_id, "flow-2");

    store.delete(&id).await?;
    assert!(matches!(store.get(&id).await, Err(SessionError::NotFound)));

    // Deleting an absent session is not an error.
    store.delete(&id).await?;

    assert_eq!(store.health().await, StoreHealth::Ok);
    Ok(())
}

#[tokio::test]
async fn expired_sessions_are_not_returned() -> Result<()> {
    let Some(store) = store(Duration::from_secs(1)).await? else {
        return Ok(());
    };
    let id = Ulid::new().to_string();

    store.save(&id, &session("flow-1")).await?;
    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert!(matches!(store.get(&id).await, Err(SessionError::NotFound)));
    Ok(())
}

#[tokio::test]
async fn purge_removes_expired_rows() -> Result<()> {
    let Some(store) = store(Duration::from_secs(1)).await? else {
        return Ok(());
    };
    let id = Ulid::new().to_string();

    store.save(&id, &session("flow-1")).await?;
    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert!(store.purge_expired().await? >= 1);
    Ok(())
}
