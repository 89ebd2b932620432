use crate::api::audit;
use crate::handshake::{Handshake, StepOutcome, StepRequest};
use axum::{
    extract::{ConnectInfo, Extension},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc};
use tracing::{debug, instrument};
use utoipa::ToSchema;

/// One keyboard-interactive step as sent by SFTPGo.
#[derive(ToSchema, Deserialize, Debug, Default)]
pub struct AuthHookRequest {
    #[serde(rename = "RequestID", default)]
    pub request_id: String,
    #[serde(rename = "Step", default)]
    pub step: i64,
    #[serde(rename = "Username", default)]
    pub username: String,
    #[serde(rename = "Answers", default)]
    pub answers: Option<Vec<String>>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct AuthHookResponse {
    /// -1 failure, 0 more steps required, 1 success.
    pub auth_result: i8,
    pub instruction: String,
    pub questions: Vec<String>,
    pub check_password: i8,
    pub echos: Vec<bool>,
}

impl From<StepOutcome> for AuthHookResponse {
    fn from(outcome: StepOutcome) -> Self {
        Self {
            auth_result: outcome.result.code(),
            instruction: outcome.instruction,
            questions: outcome.questions,
            check_password: 0,
            echos: outcome.echos,
        }
    }
}

#[utoipa::path(
    post,
    path= "/auth-hook",
    request_body = AuthHookRequest,
    responses (
        (status = 200, description = "Step result; failures are reported in auth_result", body = AuthHookResponse),
        (status = 400, description = "Malformed payload"),
        (status = 401, description = "Missing or invalid API-Key header"),
        (status = 405, description = "Method not allowed")
    ),
    tag= "hooks"
)]
#[instrument(skip_all)]
pub async fn auth_hook(
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
    handshake: Extension<Arc<Handshake>>,
    payload: Option<Json<AuthHookRequest>>,
) -> impl IntoResponse {
    let Some(Json(payload)) = payload else {
        return (StatusCode::BAD_REQUEST, "Bad Request").into_response();
    };

    debug!(
        "auth-hook: step={} id={} user={}",
        payload.step, payload.request_id, payload.username
    );

    let request = StepRequest {
        request_id: payload.request_id,
        step: payload.step,
        username: payload.username,
        answers: payload.answers.unwrap_or_default(),
    };

    let outcome = handshake.advance(&request).await;

    let detail = format!(
        "step={} id={} instruction={} questions={}",
        request.step,
        request.request_id,
        outcome.instruction,
        outcome.questions.join(",")
    );
    audit::record(
        &audit::client_ip(&headers, peer.map(|ConnectInfo(addr)| addr)),
        &request.username,
        audit::ACTION_AUTH_HOOK,
        outcome.result.audit_status(),
        &detail,
    );

    (StatusCode::OK, Json(AuthHookResponse::from(outcome))).into_response()
}
