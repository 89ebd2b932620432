use crate::api::audit;
use axum::{
    extract::{ConnectInfo, Extension, Request},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use secrecy::{ExposeSecret, SecretString};
use std::net::SocketAddr;
use tracing::warn;

pub const API_KEY_HEADER: &str = "API-Key";

/// Shared secret expected on hook requests. An empty key disables the check.
#[derive(Clone, Debug, Default)]
pub struct ApiKey(Option<SecretString>);

impl ApiKey {
    #[must_use]
    pub fn new(key: Option<SecretString>) -> Self {
        Self(key.filter(|key| !key.expose_secret().is_empty()))
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.0.is_some()
    }

    #[must_use]
    pub fn accepts(&self, provided: Option<&str>) -> bool {
        match &self.0 {
            None => true,
            Some(expected) => provided == Some(expected.expose_secret()),
        }
    }
}

/// Reject hook requests that do not carry the configured `API-Key`.
pub async fn require(
    Extension(api_key): Extension<ApiKey>,
    peer: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    if api_key.accepts(provided) {
        return next.run(request).await;
    }

    let client_ip = audit::client_ip(request.headers(), peer.map(|ConnectInfo(addr)| addr));
    warn!("Unauthorized access attempt from {client_ip}: invalid or missing API key");
    audit::record(
        &client_ip,
        audit::UNKNOWN_USER,
        request.uri().path(),
        "unauthorized",
        "invalid or missing api key",
    );

    (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
}
