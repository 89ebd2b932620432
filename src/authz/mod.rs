//! Pre-login authorization decisions.
//!
//! Turns a username into one of three outcomes: a folder grant, the fixed
//! anonymous grant for identities the directory does not know, or no content
//! when a known identity has no folders. Upstream failures degrade to the
//! least privileged outcome and are only logged.

pub mod grant;

use crate::entitlement::EntitlementResolver;
use crate::identity::{
    validate_username, Classifier, Organization, ResolvedIdentity, UsernameError,
};
use crate::idp::{DirectoryRecord, IdentityProvider};
use crate::sftpgo::{validate_folder_name, FolderProvisioner};
use std::sync::Arc;
use tracing::{debug, error, warn};

pub use self::grant::Grant;

#[derive(Debug, Clone)]
pub struct AuthorizerConfig {
    /// Role display name that marks internal staff.
    pub check_role: String,
    pub home_root: String,
    pub folder_root: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Granted(Grant),
    Anonymous(Grant),
    NoContent,
}

impl Outcome {
    #[must_use]
    pub const fn audit_status(&self) -> &'static str {
        match self {
            Self::Granted(_) => "success",
            Self::Anonymous(_) | Self::NoContent => "denied",
        }
    }
}

/// Outcome plus what the audit trail needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// Username after project-key stripping.
    pub username: String,
    pub outcome: Outcome,
    pub detail: String,
}

pub struct Authorizer {
    classifier: Classifier,
    idp: Arc<dyn IdentityProvider>,
    entitlements: Arc<dyn EntitlementResolver>,
    provisioner: Arc<dyn FolderProvisioner>,
    config: AuthorizerConfig,
}

impl Authorizer {
    #[must_use]
    pub fn new(
        classifier: Classifier,
            idp: Arc<dyn IdentityProvider>,
        entitlements: Arc<dyn EntitlementResolver>,
        provisioner: Arc<dyn FolderProvisioner>,
        config: AuthorizerConfig,
    ) -> Self {
        Self {
            classifier,
            idp,
            entitlements,
            provisioner,
            config,
        }
    }

    /// Decide what `username` may access.
    ///
    /// # Errors
    /// Returns [`UsernameError`] for malformed usernames; no upstream call is made.
    pub async fn authorize(&self, username: &str) -> Result<Decision, UsernameError> {
        validate_username(username)?;

        let identity = self.classifier.resolve(username);
        debug!(
            organization = identity.organization.as_str(),
            project_key = identity.project_key.as_deref(),
            "Processing pre-login for {}",
            identity.username
        );

        let record = match self
            .idp
            .find_user(identity.organization, &identity.username)
            .await
        {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!("{} not found in directory", identity.username);
                return Ok(self.anonymous(identity.username));
            }
            Err(err) => {
                error!("Directory lookup for {} failed: {err:#}", identity.username);
                return Ok(self.anonymous(identity.username));
            }
        };

        let internal_role = identity.organization == Organization::Internal
            && record.has_role(&self.config.check_role);

        let folders = self.resolve_folders(&identity, &record, internal_role).await;

        if folders.is_empty() {
            debug!("No folders for {}", identity.username);
            return Ok(Decision {
                username: identity.username,
                outcome: Outcome::NoContent,
                detail: "no folders found".to_string(),
            });
        }

        if let Err(err) = self.provisioner.ensure_folders(&folders).await {
            error!(
                "Failed to provision folders for {}: {err:#}",
                identity.username
            );
        }

        let grant = Grant::with_folders(
            &identity.username,
            &self.config.home_root,
            &self.config.folder_root,
            &folders,
        );
        let detail = format!(
            "internal_role={internal_role} folders={}",
            grant.folder_names().join(",")
        );
        Ok(Decision {
            username: identity.username,
            outcome: Outcome::Granted(grant),
            detail,
        })
    }

    fn anonymous(&self, username: String) -> Decision {
        Decision {
            username,
            outcome: Outcome::Anonymous(Grant::anonymous(&self.config.home_root)),
            detail: "user not found in directory, anonymous user returned".to_string(),
        }
    }

    async fn resolve_folders(
        &self,
        identity: &ResolvedIdentity,
        record: &DirectoryRecord,
        internal_role: bool,
    ) -> Vec<String> {
        let resolved = if internal_role {
            self.project_key_folders(identity).await
        } else {
            self.subscription_folders(&identity.username).await
        };

        let mut folders = accept_folders(&identity.username, resolved);
        if folders.is_empty() {
            folders = accept_folders(&identity.username, record.legacy_folders());
            if !folders.is_empty() {
                debug!(
                    "Using directory folders for {}: {folders:?}",
                    identity.username
                );
            }
        }
        folders
    }

    async fn project_key_folders(&self, identity: &ResolvedIdentity) -> Vec<String> {
        let Some(key) = identity.project_key.as_deref() else {
            debug!("No project key supplied by internal user {}", identity.username);
            return Vec::new();
        };

        match self.entitlements.is_valid_project_key(key).await {
            Ok(true) => vec![key.to_string()],
            Ok(false) => {
                warn!(
                    "Project key {key} supplied by {} is not valid",
                    identity.username
                );
                Vec::new()
            }
            Err(err) => {
                error!("Project key {key} validation failed: {err:#}");
                Vec::new()
            }
        }
    }

    async fn subscription_folders(&self, username: &str) -> Vec<String> {
        match self.entitlements.folders_for(username).await {
            Ok(folders) => folders,
            Err(err) => {
                error!("Folder list lookup for {username} failed: {err:#}");
                Vec::new()
            }
        }
    }
}

/// Drop unsafe names and duplicates, keeping first-seen order.
fn accept_folders(username: &str, folders: Vec<String>) -> Vec<String> {
    let mut accepted: Vec<String> = Vec::with_capacity(folders.len());
    for folder in folders {
        if let Err(err) = validate_folder_name(&folder) {
            warn!("Dropping folder for {username}: {err}");
            continue;
        }
        if !accepted.contains(&folder) {
            accepted.push(folder);
        }
    }
    accepted
}
