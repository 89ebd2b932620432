//! Audit trail of hook decisions, emitted on the `audit` tracing target.

use axum::http::HeaderMap;
use std::net::SocketAddr;
use tracing::info;

pub const ACTION_AUTH_HOOK: &str = "auth-hook";
pub const ACTION_PRELOGIN_HOOK: &str = "pre-login-hook";
pub const UNKNOWN_USER: &str = "unknown";

/// Address of the caller, preferring proxy headers over the socket peer.
#[must_use]
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    forwarded
        .or_else(real_ip)
        .map(ToString::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

pub fn record(client_ip: &str, user: &str, action: &str, status: &str, detail: &str) {
    info!(
        target: "audit",
        client_ip,
        user,
        action,
        status,
        detail,
        "audit event"
    );
}
