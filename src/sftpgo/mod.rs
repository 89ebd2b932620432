//! Folder provisioning against the SFTPGo admin API.
//!
//! Provisioning is check-then-create and not transactional: two requests
//! creating the same folder concurrently make one of them fail.

use crate::authz::grant::{join_path, Grant};
use crate::http_client;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FolderNameError {
    #[error("folder name is empty")]
    Empty,
    #[error("folder name {0:?} contains '..', '/' or '\\'")]
    IllegalCharacters(String),
}

/// # Errors
/// Returns an error for names that could escape the folder root.
pub fn validate_folder_name(name: &str) -> Result<(), FolderNameError> {
    if name.is_empty() {
        return Err(FolderNameError::Empty);
    }
    if name.contains("..") || name.contains('/') || name.contains('\\') {
        return Err(FolderNameError::IllegalCharacters(name.to_string()));
    }
    Ok(())
}

#[async_trait]
pub trait FolderProvisioner: Send + Sync {
    /// Create every folder that does not exist yet. Keeps going past
    /// individual failures and reports them together.
    async fn ensure_folders(&self, folders: &[String]) -> Result<()>;

    /// Replace the SFTPGo user with the given grant. Every granted folder must exist.
    async fn update_user(&self, grant: &Grant) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct AdminToken {
    access_token: String,
}

#[derive(Debug, Serialize)]
struct NewFolder<'a> {
    name: &'a str,
    mapped_path: &'a str,
}

#[derive(Debug, Clone)]
pub struct SftpgoClient {
    client: Client,
    api_base: Url,
    admin_user: String,
    admin_key: SecretString,
    folder_root: String,
}

impl SftpgoClient {
    /// # Errors
    /// Returns an error if `api_base` is not an absolute URL.
    pub fn new(
        client: Client,
        api_base: &str,
        admin_user: String,
        admin_key: SecretString,
        folder_root: String,
    ) -> Result<Self> {
        let api_base =
            Url::parse(api_base).with_context(|| format!("Invalid SFTPGo API base: {api_base}"))?;
        if api_base.cannot_be_a_base() {
            bail!("SFTPGo API base cannot be a base URL: {api_base}");
        }
        Ok(Self {
            client,
            api_base,
            admin_user,
            admin_key,
            folder_root,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow!("SFTPGo API base cannot be a base URL"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn admin_token(&self) -> Result<String> {
        let request = self
            .client
            .get(self.endpoint(&["token"])?)
            .basic_auth(&self.admin_user, Some(self.admin_key.expose_secret()));
        let response = http_client::send(request).await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = http_client::body_snippet(response).await;
            bail!("SFTPGo admin token request failed with status {status}: {body}");
        }

        let token: AdminToken = response
            .json()
            .await
            .context("Failed to parse SFTPGo admin token response")?;
        Ok(token.access_token)
    }

    async fn folder_exists(&self, name: &str, token: &str) -> Result<bool> {
        let request = self
            .client
            .get(self.endpoint(&["folders", name])?)
            .bearer_auth(token);
        let response = http_client::send(request).await?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => {
                let body = http_client::body_snippet(response).await;
                bail!("Unexpected status {status} checking folder {name}: {body}")
            }
        }
    }

    async fn create_folder(&self, name: &str, token: &str) -> Result<()> {
        let mapped_path = join_path(&self.folder_root, name);
        let request = self
            .client
            .post(self.endpoint(&["folders"])?)
            .bearer_auth(token)
            .json(&NewFolder {
                name,
                mapped_path: &mapped_path,
            });
        let response = http_client::send(request).await?;

        let status = response.status();
        if status != StatusCode::CREATED {
            let body = http_client::body_snippet(response).await;
            bail!("Folder creation for {name} failed with status {status}: {body}");
        }
        debug!("Created SFTPGo folder {name} at {mapped_path}");
        Ok(())
    }

    async fn ensure_folder(&self, name: &str, token: &str) -> Result<()> {
        validate_folder_name(name)?;
        if self.folder_exists(name, token).await? {
            debug!("Folder {name} already exists");
            return Ok(());
        }
        self.create_folder(name, token).await
    }
}

#[async_trait]
impl FolderProvisioner for SftpgoClient {
    async fn ensure_folders(&self, folders: &[String]) -> Result<()> {
        if folders.is_empty() {
            return Ok(());
        }

        let token = self.admin_token().await?;
        let mut failed = Vec::new();
        for folder in folders {
            if let Err(err) = self.ensure_folder(folder, &token).await {
                error!("Failed to provision folder {folder}: {err:#}");
                failed.push(folder.as_str());
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            bail!("Failed to provision folders: {}", failed.join(","))
        }
    }

    async fn update_user(&self, grant: &Grant) -> Result<()> {
        let token = self
            .admin_token()
            .await
            .with_context(|| format!("Failed to get admin token to update {}", grant.username))?;

        for folder in &grant.virtual_folders {
            if !self.folder_exists(&folder.name, &token).await? {
                bail!(
                    "Folder {} does not exist, cannot update user {}",
                    folder.name,
                    grant.username
                );
            }
        }

        let request = self
            .client
            .put(self.endpoint(&["users", &grant.username])?)
            .bearer_auth(&token)
            .json(grant);
        let response = http_client::send(request).await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = http_client::body_snippet(response).await;
            bail!(
                "Unexpected status {status} updating user {}: {body}",
                grant.username
            );
        }
        debug!("SFTPGo user {} updated", grant.username);
        Ok(())
    }
}
