//! In-process fakes of the upstream collaborators.

#![allow(dead_code)]

use crate::authz::grant::Grant;
use crate::entitlement::EntitlementResolver;
use crate::identity::Organization;
use crate::idp::types::{Role, StepMessage};
use crate::idp::{
    AuthnRequest, Authenticator, AuthenticatorParam, DirectoryRecord, FlowResponse,
    IdentityProvider, NextStep,
};
use crate::sftpgo::FolderProvisioner;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

fn lock<T>(mutex: &Mutex<T>) -> Result<std::sync::MutexGuard<'_, T>> {
    mutex.lock().map_err(|_| anyhow!("fake lock poisoned"))
}

#[derive(Default)]
pub struct FakeIdp {
    pub users: HashMap<String, DirectoryRecord>,
    pub lookup_fails: bool,
    /// `None` makes flow initiation fail.
    pub init: Option<FlowResponse>,
    /// Consumed in order; an empty queue or a `None` entry is a transport error.
    pub authn: Mutex<VecDeque<Option<FlowResponse>>>,
    pub lookups: Mutex<Vec<(Organization, String)>>,
    pub inits: Mutex<Vec<Organization>>,
    pub authn_requests: Mutex<Vec<(Organization, AuthnRequest)>>,
}

impl FakeIdp {
    pub fn with_user(mut self, username: &str, roles: &[&str], legacy_folders: &str) -> Self {
        let mut record = DirectoryRecord {
            id: format!("id-{username}"),
            user_name: format!("DEFAULT/{username}"),
            ..DirectoryRecord::default()
        };
        record.roles = roles
            .iter()
            .map(|role| Role {
                display: (*role).to_string(),
                value: format!("role-{role}"),
            })
            .collect();
        record.custom.sftp_folders = legacy_folders.to_string();
        self.users.insert(username.to_string(), record);
        self
    }

    pub fn with_init(mut self, response: FlowResponse) -> Self {
        self.init = Some(response);
        self
    }

    pub fn push_authn(&self, response: Option<FlowResponse>) {
        if let Ok(mut queue) = self.authn.lock() {
            queue.push_back(response);
        }
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.lock().map(|l| l.len()).unwrap_or_default()
    }

    pub fn init_count(&self) -> usize {
        self.inits.lock().map(|l| l.len()).unwrap_or_default()
    }

    pub fn authn_requests(&self) -> Vec<(Organization, AuthnRequest)> {
        self.authn_requests
            .lock()
            .map(|l| l.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl IdentityProvider for FakeIdp {
    async fn find_user(
        &self,
        organization: Organization,
        username: &str,
    ) -> Result<Option<DirectoryRecord>> {
        lock(&self.lookups)?.push((organization, username.to_string()));
        if self.lookup_fails {
            return Err(anyhow!("directory unavailable"));
        }
        Ok(self.users.get(username).cloned())
    }

    async fn init_flow(&self, organization: Organization) -> Result<FlowResponse> {
        lock(&self.inits)?.push(organization);
        self.init
            .clone()
            .ok_or_else(|| anyhow!("flow initiation failed"))
    }

    async fn authenticate(
        &self,
        organization: Organization,
        request: &AuthnRequest,
    ) -> Result<FlowResponse> {
        lock(&self.authn_requests)?.push((organization, request.clone()));
        lock(&self.authn)?
            .pop_front()
            .flatten()
            .ok_or_else(|| anyhow!("authn transport error"))
    }
}

#[derive(Default)]
pub struct FakeEntitlements {
    pub folders: HashMap<String, Vec<String>>,
    pub valid_keys: HashSet<String>,
    pub fails: bool,
    pub folder_lookups: Mutex<Vec<String>>,
    pub key_checks: Mutex<Vec<String>>,
}

impl FakeEntitlements {
    pub fn with_folders(mut self, username: &str, folders: &[&str]) -> Self {
        self.folders.insert(
            username.to_string(),
            folders.iter().map(ToString::to_string).collect(),
        );
        self
    }

    pub fn with_valid_key(mut self, key: &str) -> Self {
        self.valid_keys.insert(key.to_string());
        self
    }

    pub fn folder_lookup_count(&self) -> usize {
        self.folder_lookups.lock().map(|l| l.len()).unwrap_or_default()
    }

    pub fn key_check_count(&self) -> usize {
        self.key_checks.lock().map(|l| l.len()).unwrap_or_default()
    }
}

#[async_trait]
impl EntitlementResolver for FakeEntitlements {
    async fn folders_for(&self, username: &str) -> Result<Vec<String>> {
        lock(&self.folder_lookups)?.push(username.to_string());
        if self.fails {
            return Err(anyhow!("subscription service unavailable"));
        }
        Ok(self.folders.get(username).cloned().unwrap_or_default())
    }

    async fn is_valid_project_key(&self, project_key: &str) -> Result<bool> {
        lock(&self.key_checks)?.push(project_key.to_string());
        if self.fails {
            return Err(anyhow!("project service unavailable"));
        }
        Ok(self.valid_keys.contains(project_key))
    }
}

#[derive(Default)]
pub struct FakeProvisioner {
    pub fails: bool,
    pub ensured: Mutex<Vec<Vec<String>>>,
    pub updated: Mutex<Vec<Grant>>,
}

impl FakeProvisioner {
    pub fn ensured(&self) -> Vec<Vec<String>> {
        self.ensured.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl FolderProvisioner for FakeProvisioner {
    async fn ensure_folders(&self, folders: &[String]) -> Result<()> {
        lock(&self.ensured)?.push(folders.to_vec());
        if self.fails {
            return Err(anyhow!("folder API unavailable"));
        }
        Ok(())
    }

    async fn update_user(&self, grant: &Grant) -> Result<()> {
        lock(&self.updated)?.push(grant.clone());
        Ok(())
    }
}

pub fn param(name: &str, display: &str, confidential: bool) -> AuthenticatorParam {
    AuthenticatorParam {
        param: name.to_string(),
        param_type: "STRING".to_string(),
        confidential,
        display_name: display.to_string(),
        order: 0,
    }
}

pub fn authenticator(id: &str, display: &str, params: Vec<AuthenticatorParam>) -> Authenticator {
    Authenticator {
        authenticator_id: id.to_string(),
        authenticator: display.to_string(),
        metadata: crate::idp::types::AuthenticatorMetadata { params },
    }
}

pub fn step(step_type: &str, authenticators: Vec<Authenticator>, message: Option<&str>) -> NextStep {
    NextStep {
        step_type: step_type.to_string(),
        authenticators,
        messages: message
            .map(|m| {
                vec![StepMessage {
                    message: m.to_string(),
                }]
            })
            .unwrap_or_default(),
    }
}

pub fn flow(status: &str, flow_id: &str, next_step: Option<NextStep>) -> FlowResponse {
    FlowResponse {
        flow_status: status.to_string(),
        flow_id: Some(flow_id.to_string()),
        next_step,
        ..FlowResponse::default()
    }
}

/// Identifier-first step returned by flow initiation.
pub fn identifier_first() -> NextStep {
    step(
        "AUTHENTICATOR_PROMPT",
        vec![authenticator(
            "identifier-first",
            "Identifier First",
            vec![param("username", "Username", false)],
        )],
        None,
    )
}

/// Username and password step.
pub fn basic_step() -> NextStep {
    step(
        "AUTHENTICATOR_PROMPT",
        vec![authenticator(
            "basic",
            "Username & Password",
            vec![
                param("username", "Username", false),
                param("password", "Password", true),
            ],
        )],
        Some("Enter your password"),
    )
}
