//! Shared outbound HTTP plumbing.
//!
//! Every upstream call goes through [`send`], which records method, URL,
//! status and elapsed time on an `http.client` span. Response bodies of failed
//! calls are only ever logged, never returned to hook callers.

use crate::APP_USER_AGENT;
use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, Response};
use std::time::{Duration, Instant};
use tracing::{debug, error, info_span, Instrument};

const MAX_LOGGED_BODY: usize = 1024;

/// Build the client shared by all upstream integrations.
///
/// # Errors
/// Returns an error if the TLS backend cannot be initialized.
pub fn build(timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(APP_USER_AGENT)
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")
}

/// Send a request once, logging the exchange. Non-2xx statuses are returned
/// as-is so callers can branch on them.
///
/// # Errors
/// Returns an error on transport failures and timeouts.
pub async fn send(request: RequestBuilder) -> Result<Response> {
    let (client, request) = request.build_split();
    let request = request.context("Failed to build outbound request")?;
    let method = request.method().clone();
    let url = request.url().clone();

    let span = info_span!(
        "http.client",
        http.method = %method,
        url.path = url.path(),
        server.address = url.host_str().unwrap_or_default()
    );

    let start = Instant::now();
    match client.execute(request).instrument(span).await {
        Ok(response) => {
            debug!(
                method = %method,
                url = %url,
                status = response.status().as_u16(),
                elapsed_ms = start.elapsed().as_millis(),
                "outbound request completed"
            );
            Ok(response)
        }
        Err(err) => {
            error!(
                method = %method,
                url = %url,
                elapsed_ms = start.elapsed().as_millis(),
                "outbound request failed: {err}"
            );
            Err(err).with_context(|| format!("{method} {url} failed"))
        }
    }
}

/// Drain a response body for logging, truncated.
pub async fn body_snippet(response: Response) -> String {
    match response.text().await {
        Ok(mut body) => {
            if body.len() > MAX_LOGGED_BODY {
                let mut cut = MAX_LOGGED_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
                body.push_str("...");
            }
            body
        }
        Err(err) => format!("<unreadable body: {err}>"),
    }
}
