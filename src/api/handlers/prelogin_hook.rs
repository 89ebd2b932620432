use crate::api::audit;
use crate::authz::{Authorizer, Grant, Outcome};
use axum::{
    extract::{ConnectInfo, Extension},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use std::{net::SocketAddr, sync::Arc};
use tracing::{debug, error, instrument};
use utoipa::ToSchema;

/// User record sent by SFTPGo before login; only the username is used.
#[derive(ToSchema, Deserialize, Debug, Default)]
pub struct PreLoginRequest {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub username: String,
}

#[utoipa::path(
    post,
    path= "/prelogin-hook",
    request_body = PreLoginRequest,
    responses (
        (status = 200, description = "Grant for the user, or the anonymous grant for unknown users", body = Grant),
        (status = 204, description = "Known user without any folders"),
        (status = 400, description = "Malformed payload or username"),
        (status = 401, description = "Missing or invalid API-Key header"),
        (status = 405, description = "Method not allowed")
    ),
    tag= "hooks"
)]
#[instrument(skip_all)]
pub async fn prelogin_hook(
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
    authorizer: Extension<Arc<Authorizer>>,
    payload: Option<Json<PreLoginRequest>>,
) -> impl IntoResponse {
    let client_ip = audit::client_ip(&headers, peer.map(|ConnectInfo(addr)| addr));
    let record = |user: &str, status: &str, detail: &str| {
        audit::record(&client_ip, user, audit::ACTION_PRELOGIN_HOOK, status, detail);
    };

    let Some(Json(payload)) = payload else {
        error!("Invalid payload in pre-login hook");
        record(audit::UNKNOWN_USER, "failure", "invalid payload");
        return (StatusCode::BAD_REQUEST, "Invalid payload").into_response();
    };

    if payload.username.is_empty() {
        error!("No username in pre-login hook payload");
        record(audit::UNKNOWN_USER, "failure", "no username");
        return (StatusCode::BAD_REQUEST, "Invalid request payload").into_response();
    }

    debug!("Processing pre-login hook for user id {}", payload.id);

    let decision = match authorizer.authorize(&payload.username).await {
        Ok(decision) => decision,
        Err(err) => {
            error!("Invalid username {:?}: {err}", payload.username);
            record(&payload.username, "failure", "invalid username");
            return (StatusCode::BAD_REQUEST, "Invalid username").into_response();
        }
    };

    record(
        &decision.username,
        decision.outcome.audit_status(),
        &decision.detail,
    );

    match decision.outcome {
        Outcome::Granted(grant) | Outcome::Anonymous(grant) => {
            (StatusCode::OK, Json(grant)).into_response()
        }
        Outcome::NoContent => StatusCode::NO_CONTENT.into_response(),
    }
}
