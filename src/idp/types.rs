use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A parameter an authenticator expects the user to supply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorParam {
    pub param: String,
    #[serde(rename = "type", default)]
    pub param_type: String,
    #[serde(default)]
    pub confidential: bool,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub order: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatorMetadata {
    #[serde(default)]
    pub params: Vec<AuthenticatorParam>,
}

/// One selectable authentication method offered at a flow step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Authenticator {
    pub authenticator_id: String,
    /// Display name.
    #[serde(default)]
    pub authenticator: String,
    #[serde(default)]
    pub metadata: AuthenticatorMetadata,
}

impl Authenticator {
    /// Parameters the user answers, in declared order. `username` is supplied
    /// by the hook itself and never prompted for.
    pub fn prompted_params(&self) -> impl Iterator<Item = &AuthenticatorParam> {
        self.metadata
            .params
            .iter()
            .filter(|param| param.param != USERNAME_PARAM)
    }
}

pub const USERNAME_PARAM: &str = "username";
pub const PASSWORD_PARAM: &str = "password";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepMessage {
    #[serde(default)]
    pub message: String,
}

/// The next step descriptor of an in-flight flow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextStep {
    #[serde(default)]
    pub step_type: String,
    #[serde(default)]
    pub authenticators: Vec<Authenticator>,
    #[serde(default)]
    pub messages: Vec<StepMessage>,
}

impl NextStep {
    #[must_use]
    pub fn has_authenticators(&self) -> bool {
        !self.authenticators.is_empty()
    }
}

pub const STEP_TYPE_MULTI_OPTIONS: &str = "MULTI_OPTIONS_PROMPT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowStatus {
    SuccessCompleted,
    Incomplete,
    FailIncomplete,
    Failed,
    Other(String),
}

impl FlowStatus {
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "SUCCESS_COMPLETED" => Self::SuccessCompleted,
            "INCOMPLETE" => Self::Incomplete,
            "FAIL_INCOMPLETE" => Self::FailIncomplete,
            "FAILED" => Self::Failed,
            other => Self::Other(other.to_string()),
        }
    }

    /// The flow expects another step from the user.
    #[must_use]
    pub const fn is_continuing(&self) -> bool {
        matches!(self, Self::Incomplete | Self::FailIncomplete)
    }
}

/// Response of both the authorize and authn endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowResponse {
    #[serde(default)]
    pub flow_status: String,
    #[serde(default)]
    pub flow_id: Option<String>,
    #[serde(default)]
    pub next_step: Option<NextStep>,
    #[serde(default)]
    pub authorization_code: Option<String>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

impl FlowResponse {
    #[must_use]
    pub fn status(&self) -> FlowStatus {
        FlowStatus::parse(&self.flow_status)
    }

    /// Flow identifier if present and non-empty.
    #[must_use]
    pub fn flow_id(&self) -> Option<&str> {
        self.flow_id.as_deref().filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedAuthenticator {
    pub authenticator_id: String,
    pub params: BTreeMap<String, String>,
}

/// Payload posted to the flow authentication endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthnRequest {
    pub flow_id: String,
    pub selected_authenticator: SelectedAuthenticator,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Role {
    #[serde(default)]
    pub display: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CustomUserExtension {
    #[serde(rename = "SFTPFolders", default)]
    pub sftp_folders: String,
    #[serde(rename = "SFTPProjects", default)]
    pub sftp_projects: String,
}

/// User attributes returned by the SCIM directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(rename = "urn:scim:schemas:extension:custom:User", default)]
    pub custom: CustomUserExtension,
}

impl DirectoryRecord {
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.display == role)
    }

    /// Legacy comma separated folder attribute, lower-cased.
    #[must_use]
    pub fn legacy_folders(&self) -> Vec<String> {
        let mut folders: Vec<String> = Vec::new();
        for folder in self.custom.sftp_folders.to_lowercase().split(',') {
            let folder = folder.trim();
            if !folder.is_empty() && !folders.iter().any(|f| f == folder) {
                folders.push(folder.to_string());
            }
        }
        folders
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ScimListResponse {
    #[serde(rename = "Resources", default)]
    pub resources: Vec<DirectoryRecord>,
}
