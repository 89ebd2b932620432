//! Keyboard-interactive handshake driven by the auth hook.
//!
//! Step 1 starts an IdP flow and runs identifier-first discovery. Every later
//! step resumes the flow stored under the SFTPGo request identifier, submits
//! the user's answers and either finishes, fails, or stores the next step.
//! Nothing is retried: any upstream error ends the attempt and SFTPGo starts
//! over from step 1.
//!
//! Two concurrent steps for the same request identifier race on the session
//! store and the last write wins.

pub mod prompt;

use crate::identity::{validate_username, Classifier, Organization, UsernameError};
use crate::idp::types::{PASSWORD_PARAM, USERNAME_PARAM};
use crate::idp::{
    AuthnRequest, Authenticator, FlowStatus, IdentityProvider, NextStep, SelectedAuthenticator,
};
use crate::session::{SessionData, SessionError, SessionStore};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, warn};

pub use self::prompt::{is_selection_prompt, prompt_for, Prompt};

pub const MSG_USERNAME_MISSING: &str = "Authentication failed: Username not provided.";
pub const MSG_USERNAME_INVALID: &str = "Authentication failed: Invalid username.";
pub const MSG_INIT_FAILED: &str = "Authentication failed: Error initiating flow.";
pub const MSG_FAILED: &str = "Authentication failed.";
pub const MSG_SESSION_INVALID: &str = "Authentication session expired or invalid.";
pub const MSG_NO_SELECTION: &str = "Authentication failed: No selection provided.";
pub const MSG_INVALID_SELECTION: &str = "Authentication failed: Invalid selection.";

/// Result codes understood by SFTPGo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthResult {
    Failure,
    Incomplete,
    Success,
}

impl AuthResult {
    #[must_use]
    pub const fn code(self) -> i8 {
        match self {
            Self::Failure => -1,
            Self::Incomplete => 0,
            Self::Success => 1,
        }
    }

    #[must_use]
    pub const fn audit_status(self) -> &'static str {
        match self {
            Self::Failure => "failure",
            Self::Incomplete => "incomplete",
            Self::Success => "success",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StepRequest {
    pub request_id: String,
    pub step: i64,
    pub username: String,
    pub answers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub result: AuthResult,
    pub instruction: String,
    pub questions: Vec<String>,
    pub echos: Vec<bool>,
}

impl StepOutcome {
    fn failure(instruction: &str) -> Self {
        Self {
            result: AuthResult::Failure,
            instruction: instruction.to_string(),
            questions: Vec::new(),
            echos: Vec::new(),
        }
    }

    fn success() -> Self {
        Self {
            result: AuthResult::Success,
            instruction: String::new(),
            questions: Vec::new(),
            echos: Vec::new(),
        }
    }

    fn incomplete(prompt: Prompt) -> Self {
        Self {
            result: AuthResult::Incomplete,
            instruction: prompt.instruction,
            questions: prompt.questions,
            echos: prompt.echos,
        }
    }
}

pub struct Handshake {
    classifier: Classifier,
    idp: Arc<dyn IdentityProvider>,
    sessions: Arc<dyn SessionStore>,
}

impl Handshake {
    #[must_use]
    pub fn new(
        classifier: Classifier,
        idp: Arc<dyn IdentityProvider>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            classifier,
            idp,
            sessions,
        }
    }

    /// Advance the login attempt identified by `request.request_id` by one step.
    pub async fn advance(&self, request: &StepRequest) -> StepOutcome {
        debug!(
            step = request.step,
            request_id = %request.request_id,
            "auth step for {}",
            request.username
        );
        if request.step == 1 {
            self.start(request).await
        } else {
            self.resume(request).await
        }
    }

    async fn start(&self, request: &StepRequest) -> StepOutcome {
        match validate_username(&request.username) {
            Ok(()) => {}
            Err(UsernameError::Empty) => return StepOutcome::failure(MSG_USERNAME_MISSING),
            Err(err) => {
                warn!("Invalid username in auth step 1: {err}");
                return StepOutcome::failure(MSG_USERNAME_INVALID);
            }
        }

        let identity = self.classifier.resolve(&request.username);
        let organization = identity.organization;

        let init = match self.idp.init_flow(organization).await {
            Ok(init) => init,
            Err(err) => {
                error!("Failed to initiate flow: {err:#}");
                return StepOutcome::failure(MSG_INIT_FAILED);
            }
        };
        let (Some(flow_id), Some(first)) = (
            init.flow_id(),
            init.next_step
                .as_ref()
                .and_then(|step| step.authenticators.first()),
        ) else {
            error!("Flow initiation returned no flow id or no authenticators");
            return StepOutcome::failure(MSG_INIT_FAILED);
        };

        let discovery = AuthnRequest {
            flow_id: flow_id.to_string(),
            selected_authenticator: SelectedAuthenticator {
                authenticator_id: first.authenticator_id.clone(),
                params: BTreeMap::from([(USERNAME_PARAM.to_string(), identity.username)]),
            },
        };

        let response = match self.idp.authenticate(organization, &discovery).await {
            Ok(response) => response,
            Err(err) => {
                error!("Identifier discovery failed: {err:#}");
                return StepOutcome::failure(MSG_FAILED);
            }
        };
        if response.status() == FlowStatus::Failed {
            warn!("Identifier discovery rejected for {}", request.username);
            return StepOutcome::failure(MSG_FAILED);
        }
        let session = SessionData {
            flow_id: response.flow_id().unwrap_or(flow_id).to_string(),
            next_step: response.next_step.clone(),
        };
        if !session.is_resumable() {
            error!("Identifier discovery returned no next step");
            return StepOutcome::failure(MSG_FAILED);
        }
        if let Err(err) = self.sessions.save(&request.request_id, &session).await {
            error!("Failed to save session {}: {err}", request.request_id);
            return StepOutcome::failure(MSG_FAILED);
        }

        StepOutcome::incomplete(prompt_for(session.next_step.as_ref()))
    }

    async fn resume(&self, request: &StepRequest) -> StepOutcome {
        let session = match self.sessions.get(&request.request_id).await {
            Ok(session) => session,
            Err(SessionError::NotFound) => {
                debug!("No session for {}", request.request_id);
                return StepOutcome::failure(MSG_SESSION_INVALID);
            }
            Err(err) => {
                error!("Failed to get session {}: {err}", request.request_id);
                return StepOutcome::failure(MSG_SESSION_INVALID);
            }
        };

        let step = match session.next_step.as_ref() {
            Some(step) if session.is_resumable() => step,
            _ => {
                self.discard(&request.request_id).await;
                return StepOutcome::failure(MSG_SESSION_INVALID);
            }
        };

        let identity = self.classifier.resolve(&request.username);

        let selected = match select_authenticator(step, &request.answers, &identity.username) {
            Ok(selected) => selected,
            Err(message) => {
                self.discard(&request.request_id).await;
                return StepOutcome::failure(message);
            }
        };

        let payload = AuthnRequest {
            flow_id: session.flow_id.clone(),
            selected_authenticator: selected,
        };
        self.submit(request, identity.organization, &session, &payload)
            .await
    }

    async fn submit(
        &self,
        request: &StepRequest,
        organization: Organization,
        session: &SessionData,
        payload: &AuthnRequest,
    ) -> StepOutcome {
        let response = match self.idp.authenticate(organization, payload).await {
            Ok(response) => response,
            Err(err) => {
                error!(
                    "Flow authentication failed for {}: {err:#}",
                    request.username
                );
                self.discard(&request.request_id).await;
                return StepOutcome::failure(MSG_FAILED);
            }
        };

        match response.status() {
            FlowStatus::SuccessCompleted => {
                self.discard(&request.request_id).await;
                StepOutcome::success()
            }
            status if status.is_continuing() => {
                let updated = SessionData {
                    flow_id: response
                        .flow_id()
                        .unwrap_or(&session.flow_id)
                        .to_string(),
                    next_step: response.next_step.clone(),
                };
                if !updated.is_resumable() {
                    warn!("Flow {status:?} without a next step");
                    self.discard(&request.request_id).await;
                    return StepOutcome::failure(MSG_FAILED);
                }
                if let Err(err) = self.sessions.save(&request.request_id, &updated).await {
                    error!("Failed to save session {}: {err}", request.request_id);
                    self.discard(&request.request_id).await;
                    return StepOutcome::failure(MSG_FAILED);
                }
                StepOutcome::incomplete(prompt_for(updated.next_step.as_ref()))
            }
            status => {
                debug!("Flow ended with {status:?}");
                self.discard(&request.request_id).await;
                StepOutcome::failure(MSG_FAILED)
            }
        }
    }

    async fn discard(&self, request_id: &str) {
        if let Err(err) = self.sessions.delete(request_id).await {
            error!("Failed to delete session {request_id}: {err}");
        }
    }
}

/// Pick the authenticator answered in this step and map the answers onto its
/// parameters.
fn select_authenticator(
    step: &NextStep,
    answers: &[String],
    username: &str,
) -> Result<SelectedAuthenticator, &'static str> {
    let (authenticator, params) = if is_selection_prompt(step) {
        let answer = answers.first().ok_or(MSG_NO_SELECTION)?;
        let authenticator = answer
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|choice| choice.checked_sub(1))
            .and_then(|index| step.authenticators.get(index))
            .ok_or(MSG_INVALID_SELECTION)?;
        (authenticator, BTreeMap::new())
    } else {
        let authenticator = step.authenticators.first().ok_or(MSG_SESSION_INVALID)?;
        (authenticator, map_answers(authenticator, answers, username))
    };

    Ok(SelectedAuthenticator {
        authenticator_id: authenticator.authenticator_id.clone(),
        params,
    })
}

fn map_answers(
    authenticator: &Authenticator,
    answers: &[String],
    username: &str,
) -> BTreeMap<String, String> {
    let mut params: BTreeMap<String, String> = authenticator
        .prompted_params()
        .zip(answers)
        .map(|(param, answer)| (param.param.clone(), answer.clone()))
        .collect();

    // Password-only authenticators still expect the username alongside.
    if params.len() == 1 && params.contains_key(PASSWORD_PARAM) {
        params.insert(USERNAME_PARAM.to_string(), username.to_string());
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySessionStore;
    use crate::test_support::{
        authenticator, basic_step, flow, identifier_first, param, step, FakeIdp,
    };
    use std::time::Duration;

    struct Harness {
        idp: Arc<FakeIdp>,
        sessions: Arc<MemorySessionStore>,
        handshake: Handshake,
    }

    fn harness(idp: FakeIdp) -> Harness {
        harness_with_store(idp, MemorySessionStore::default())
    }

    fn harness_with_store(idp: FakeIdp, store: MemorySessionStore) -> Harness {
        let idp = Arc::new(idp);
        let sessions = Arc::new(store);
        let handshake = Handshake::new(
            Classifier::new("@wso2.com"),
            idp.clone(),
            sessions.clone(),
        );
        Harness {
            idp,
            sessions,
            handshake,
        }
    }

    fn started_idp() -> FakeIdp {
        FakeIdp::default().with_init(flow("INCOMPLETE", "flow-1", Some(identifier_first())))
    }

    fn request(step: i64, username: &str, answers: &[&str]) -> StepRequest {
        StepRequest {
            request_id: "req-1".to_string(),
            step,
            username: username.to_string(),
            answers: answers.iter().map(ToString::to_string).collect(),
        }
    }

    fn selection_step() -> NextStep {
        step(
            "MULTI_OPTIONS_PROMPT",
            vec![
                authenticator("totp", "TOTP", vec![param("token", "Code", true)]),
                authenticator("email", "Email OTP", vec![param("otp", "OTP", true)]),
            ],
            None,
        )
    }

    async fn session(h: &Harness) -> Option<SessionData> {
        h.sessions.get("req-1").await.ok()
    }

    #[tokio::test]
    async fn empty_username_fails_without_upstream_calls() {
        let h = harness(started_idp());
        let outcome = h.handshake.advance(&request(1, "", &[])).await;
        assert_eq!(outcome, StepOutcome::failure(MSG_USERNAME_MISSING));
        assert_eq!(h.idp.init_count(), 0);
        assert!(session(&h).await.is_none());
    }

    #[tokio::test]
    async fn invalid_username_fails_without_upstream_calls() {
        let h = harness(started_idp());
        let outcome = h.handshake.advance(&request(1, "jane\n", &[])).await;
        assert_eq!(outcome.instruction, MSG_USERNAME_INVALID);
        assert_eq!(h.idp.init_count(), 0);
    }

    #[tokio::test]
    async fn start_runs_discovery_and_stores_session() {
        let h = harness(started_idp());
        h.idp
            .push_authn(Some(flow("INCOMPLETE", "flow-1", Some(basic_step()))));

        let outcome = h.handshake.advance(&request(1, "jane@acme.io", &[])).await;
        assert_eq!(outcome.result, AuthResult::Incomplete);
        assert_eq!(outcome.instruction, "Enter your password");
        assert_eq!(outcome.questions, vec!["Password: ".to_string()]);
        assert_eq!(outcome.echos, vec![false]);

        let requests = h.idp.authn_requests();
        assert_eq!(requests.len(), 1);
        let (org, discovery) = &requests[0];
        assert_eq!(*org, Organization::External);
        assert_eq!(discovery.flow_id, "flow-1");
        assert_eq!(
            discovery.selected_authenticator.authenticator_id,
            "identifier-first"
        );
        assert_eq!(
            discovery.selected_authenticator.params.get("username"),
            Some(&"jane@acme.io".to_string())
        );

        let stored = session(&h).await;
        assert_eq!(stored.as_ref().map(|s| s.flow_id.as_str()), Some("flow-1"));
        assert_eq!(stored.and_then(|s| s.next_step), Some(basic_step()));
    }

    #[tokio::test]
    async fn start_strips_project_key_for_internal_users() {
        let h = harness(started_idp());
        h.idp
            .push_authn(Some(flow("INCOMPLETE", "flow-1", Some(basic_step()))));

        h.handshake
            .advance(&request(1, "proj1@user@wso2.com", &[]))
            .await;
        let requests = h.idp.authn_requests();
        assert_eq!(requests[0].0, Organization::Internal);
        assert_eq!(
            requests[0].1.selected_authenticator.params.get("username"),
            Some(&"user@wso2.com".to_string())
        );
    }

    #[tokio::test]
    async fn init_failure_creates_no_session() {
        let h = harness(FakeIdp::default());
        let outcome = h.handshake.advance(&request(1, "jane@acme.io", &[])).await;
        assert_eq!(outcome, StepOutcome::failure(MSG_INIT_FAILED));
        assert!(session(&h).await.is_none());
    }

    #[tokio::test]
    async fn init_without_authenticators_fails() {
        let h = harness(FakeIdp::default().with_init(flow(
            "INCOMPLETE",
            "flow-1",
            Some(step("AUTHENTICATOR_PROMPT", vec![], None)),
        )));
        let outcome = h.handshake.advance(&request(1, "jane@acme.io", &[])).await;
        assert_eq!(outcome.instruction, MSG_INIT_FAILED);
        assert!(h.idp.authn_requests().is_empty());
    }

    #[tokio::test]
    async fn discovery_failure_creates_no_session() {
        for response in [None, Some(flow("FAILED", "flow-1", Some(basic_step()))), Some(flow("INCOMPLETE", "flow-1", None))] {
            let h = harness(started_idp());
            h.idp.push_authn(response);
            let outcome = h.handshake.advance(&request(1, "jane@acme.io", &[])).await;
            assert_eq!(outcome, StepOutcome::failure(MSG_FAILED));
            assert!(session(&h).await.is_none());
        }
    }

    #[tokio::test]
    async fn unknown_request_id_is_session_invalid() {
        let h = harness(started_idp());
        for answers in [&[][..], &["1"][..], &["secret", "extra"][..]] {
            let outcome = h.handshake.advance(&request(2, "jane@acme.io", answers)).await;
            assert_eq!(outcome, StepOutcome::failure(MSG_SESSION_INVALID));
        }
        assert!(h.idp.authn_requests().is_empty());
    }

    #[tokio::test]
    async fn expired_session_is_session_invalid() {
        let h = harness_with_store(started_idp(), MemorySessionStore::new(Duration::ZERO));
        h.idp
            .push_authn(Some(flow("INCOMPLETE", "flow-1", Some(basic_step()))));
        h.handshake.advance(&request(1, "jane@acme.io", &[])).await;

        let outcome = h
            .handshake
            .advance(&request(2, "jane@acme.io", &["secret"]))
            .await;
        assert_eq!(outcome.instruction, MSG_SESSION_INVALID);
    }

    #[tokio::test]
    async fn stored_session_without_options_is_invalid_and_removed() -> Result<(), SessionError> {
        let h = harness(started_idp());
        h.sessions
            .save(
                "req-1",
                &SessionData {
                    flow_id: "flow-1".to_string(),
                    next_step: Some(step("AUTHENTICATOR_PROMPT", vec![], None)),
                },
            )
            .await?;

        let outcome = h
            .handshake
            .advance(&request(2, "jane@acme.io", &["x"]))
            .await;
        assert_eq!(outcome.instruction, MSG_SESSION_INVALID);
        assert!(session(&h).await.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn password_answer_completes_flow_and_deletes_session() {
        let h = harness(started_idp());
        h.idp
            .push_authn(Some(flow("INCOMPLETE", "flow-1", Some(basic_step()))));
        h.idp.push_authn(Some(flow("SUCCESS_COMPLETED", "flow-1", None)));

        h.handshake.advance(&request(1, "jane@acme.io", &[])).await;
        let outcome = h
            .handshake
            .advance(&request(2, "jane@acme.io", &["s3cret"]))
            .await;
        assert_eq!(outcome.result, AuthResult::Success);
        assert_eq!(outcome.result.code(), 1);
        assert!(session(&h).await.is_none());

        let requests = h.idp.authn_requests();
        let params = &requests[1].1.selected_authenticator.params;
        assert_eq!(params.get("password"), Some(&"s3cret".to_string()));
        assert_eq!(params.get("username"), Some(&"jane@acme.io".to_string()));
        assert_eq!(requests[1].1.selected_authenticator.authenticator_id, "basic");

        // Deleted sessions cannot be resumed.
        let again = h
            .handshake
            .advance(&request(3, "jane@acme.io", &["s3cret"]))
            .await;
        assert_eq!(again.instruction, MSG_SESSION_INVALID);
    }

    #[tokio::test]
    async fn selection_then_code() {
        let h = harness(started_idp());
        h.idp
            .push_authn(Some(flow("INCOMPLETE", "flow-1", Some(selection_step()))));
        let totp = step(
            "AUTHENTICATOR_PROMPT",
            vec![authenticator("totp", "TOTP", vec![param("token", "Code", true)])],
            Some("Enter the code from your authenticator app"),
        );
        h.idp
            .push_authn(Some(flow("INCOMPLETE", "flow-2", Some(totp.clone()))));
        h.idp.push_authn(Some(flow("SUCCESS_COMPLETED", "flow-2", None)));

        let first = h.handshake.advance(&request(1, "jane@acme.io", &[])).await;
        assert_eq!(
            first.questions,
            vec!["1 for TOTP 2 for Email OTP Enter selection: ".to_string()]
        );
        assert_eq!(first.echos, vec![true]);

        let second = h
            .handshake
            .advance(&request(2, "jane@acme.io", &["1"]))
            .await;
        assert_eq!(second.result, AuthResult::Incomplete);
        assert_eq!(second.instruction, "Enter the code from your authenticator app");
        let stored = session(&h).await;
        assert_eq!(stored.as_ref().map(|s| s.flow_id.as_str()), Some("flow-2"));
        assert_eq!(stored.and_then(|s| s.next_step), Some(totp));

        let third = h
            .handshake
            .advance(&request(3, "jane@acme.io", &["123456"]))
            .await;
        assert_eq!(third.result, AuthResult::Success);

        let requests = h.idp.authn_requests();
        assert_eq!(requests[1].1.selected_authenticator.authenticator_id, "totp");
        assert!(requests[1].1.selected_authenticator.params.is_empty());
        assert_eq!(
            requests[2].1.selected_authenticator.params,
            BTreeMap::from([("token".to_string(), "123456".to_string())])
        );
        assert_eq!(requests[2].1.flow_id, "flow-2");
    }

    #[tokio::test]
    async fn invalid_selection_fails_without_idp_call() {
        for (answers, message) in [
            (&[][..], MSG_NO_SELECTION),
            (&["0"][..], MSG_INVALID_SELECTION),
            (&["3"][..], MSG_INVALID_SELECTION),
            (&["totp"][..], MSG_INVALID_SELECTION),
        ] {
            let h = harness(started_idp());
            h.idp
                .push_authn(Some(flow("INCOMPLETE", "flow-1", Some(selection_step()))));
            h.handshake.advance(&request(1, "jane@acme.io", &[])).await;

            let outcome = h
                .handshake
                .advance(&request(2, "jane@acme.io", answers))
                .await;
            assert_eq!(outcome, StepOutcome::failure(message));
            assert_eq!(h.idp.authn_requests().len(), 1);
            assert!(session(&h).await.is_none());
        }
    }

    #[tokio::test]
    async fn fail_incomplete_reprompts() {
        let h = harness(started_idp());
        h.idp
            .push_authn(Some(flow("INCOMPLETE", "flow-1", Some(basic_step()))));
        h.idp
            .push_authn(Some(flow("FAIL_INCOMPLETE", "flow-1", Some(basic_step()))));

        h.handshake.advance(&request(1, "jane@acme.io", &[])).await;
        let outcome = h
            .handshake
            .advance(&request(2, "jane@acme.io", &["wrong"]))
            .await;
        assert_eq!(outcome.result, AuthResult::Incomplete);
        assert_eq!(outcome.questions, vec!["Password: ".to_string()]);
        assert!(session(&h).await.is_some());
    }

    #[tokio::test]
    async fn terminal_statuses_delete_session() {
        for response in [
            None,
            Some(flow("FAILED", "flow-1", None)),
            Some(flow("SOMETHING_NEW", "flow-1", Some(basic_step()))),
            Some(flow("INCOMPLETE", "flow-1", None)),
            Some(flow(
                "INCOMPLETE",
                "flow-1",
                Some(step("AUTHENTICATOR_PROMPT", vec![], None)),
            )),
        ] {
            let h = harness(started_idp());
            h.idp
                .push_authn(Some(flow("INCOMPLETE", "flow-1", Some(basic_step()))));
            h.idp.push_authn(response);

            h.handshake.advance(&request(1, "jane@acme.io", &[])).await;
            let outcome = h
                .handshake
                .advance(&request(2, "jane@acme.io", &["pw"]))
                .await;
            assert_eq!(outcome, StepOutcome::failure(MSG_FAILED));
            assert!(session(&h).await.is_none());
        }
    }

    #[test]
    fn answers_map_positionally_and_skip_username() {
        let auth = authenticator(
            "custom",
            "Custom",
            vec![
                param("username", "Username", false),
                param("code", "Code", true),
                param("hint", "Hint", false),
            ],
        );
        let params = map_answers(&auth, &["111".to_string()], "jane");
        assert_eq!(
            params,
            BTreeMap::from([("code".to_string(), "111".to_string())])
        );

        let params = map_answers(
            &auth,
            &["111".to_string(), "blue".to_string(), "extra".to_string()],
            "jane",
        );
        assert_eq!(params.len(), 2);
        assert_eq!(params.get("hint"), Some(&"blue".to_string()));
    }

    #[test]
    fn result_codes() {
        assert_eq!(AuthResult::Failure.code(), -1);
        assert_eq!(AuthResult::Incomplete.code(), 0);
        assert_eq!(AuthResult::Success.code(), 1);
    }
}
