//! Identity Provider bridge.
//!
//! Stateless translator to the IdP's OAuth2, SCIM and flow authentication
//! endpoints. Each call is made against the tenant selected by
//! [`OrgContexts::context_for`].

pub mod types;

use crate::http_client;
use crate::identity::Organization;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::{header::ACCEPT, Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

pub use self::types::{
    AuthnRequest, Authenticator, AuthenticatorParam, DirectoryRecord, FlowResponse, FlowStatus,
    NextStep, SelectedAuthenticator,
};
use self::types::{ScimListResponse, TokenResponse};

/// Client credentials and endpoints of one IdP tenant.
#[derive(Debug, Clone)]
pub struct OrgContext {
    pub client_id: String,
    pub client_secret: SecretString,
    pub token_endpoint: String,
    pub scim_users_endpoint: String,
    pub authorize_endpoint: String,
    pub authn_endpoint: String,
}

impl OrgContext {
    /// Derive all endpoints from the tenant base URL.
    #[must_use]
    pub fn new(base_url: &str, client_id: String, client_secret: SecretString) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            client_id,
            client_secret,
            token_endpoint: format!("{base}/oauth2/token"),
            scim_users_endpoint: format!("{base}/scim2/Users"),
            authorize_endpoint: format!("{base}/oauth2/authorize/"),
            authn_endpoint: format!("{base}/oauth2/authn"),
        }
    }
}

/// The internal tenant is mandatory, the external one optional.
#[derive(Debug, Clone)]
pub struct OrgContexts {
    internal: OrgContext,
    external: Option<OrgContext>,
}

impl OrgContexts {
    #[must_use]
    pub fn new(internal: OrgContext, external: Option<OrgContext>) -> Self {
        Self { internal, external }
    }

    /// # Errors
    /// Returns an error when the external tenant is requested but not configured.
    pub fn context_for(&self, organization: Organization) -> Result<&OrgContext> {
        match organization {
            Organization::Internal => Ok(&self.internal),
            Organization::External => self
                .external
                .as_ref()
                .ok_or_else(|| anyhow!("External identity provider is not configured")),
        }
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Look up a user by exact username. `Ok(None)` when the directory has no match.
    async fn find_user(
        &self,
        organization: Organization,
        username: &str,
    ) -> Result<Option<DirectoryRecord>>;

    /// Start a direct-response authorization flow. The response always carries a flow id.
    async fn init_flow(&self, organization: Organization) -> Result<FlowResponse>;

    /// Post a selected authenticator and its parameters to the flow.
    async fn authenticate(
        &self,
        organization: Organization,
        request: &AuthnRequest,
    ) -> Result<FlowResponse>;
}

#[derive(Debug, Clone)]
pub struct IdpClient {
    client: Client,
    contexts: OrgContexts,
    callback_url: String,
    scim_scope: String,
}

impl IdpClient {
    #[must_use]
    pub fn new(
        client: Client,
        contexts: OrgContexts,
        callback_url: String,
        scim_scope: String,
    ) -> Self {
        Self {
            client,
            contexts,
            callback_url,
            scim_scope,
        }
    }

    async fn bearer_token(&self, context: &OrgContext) -> Result<String> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", context.client_id.as_str()),
            ("client_secret", context.client_secret.expose_secret()),
            ("scope", self.scim_scope.as_str()),
        ];
        let response =
            http_client::send(self.client.post(&context.token_endpoint).form(&form)).await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = http_client::body_snippet(response).await;
            bail!("Token request failed with status {status}: {body}");
        }

        let token: TokenResponse = response
            .json()
            .await
            .context("Failed to parse token response")?;
        Ok(token.access_token)
    }
}

/// SCIM filter matching one username exactly. Usernames without a user-store
/// domain are looked up in `DEFAULT`.
#[must_use]
pub fn scim_filter(username: &str) -> String {
    let qualified = if username.contains('/') {
        username.to_string()
    } else {
        format!("DEFAULT/{username}")
    };
    format!("userName eq \"{}\"", qualified.replace('"', "\\\""))
}

#[async_trait]
impl IdentityProvider for IdpClient {
    async fn find_user(
        &self,
        organization: Organization,
        username: &str,
    ) -> Result<Option<DirectoryRecord>> {
        let context = self.contexts.context_for(organization)?;
        let token = self
            .bearer_token(context)
            .await
            .context("Failed to get bearer token for SCIM API")?;

        let request = self
            .client
            .get(&context.scim_users_endpoint)
            .query(&[("filter", scim_filter(username))])
            .bearer_auth(token)
            .header(ACCEPT, "application/json");
        let response = http_client::send(request).await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = http_client::body_snippet(response).await;
            bail!("SCIM request for {username} failed with status {status}: {body}");
        }

        let list: ScimListResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse SCIM response for {username}"))?;

        let record = list.resources.into_iter().next();
        debug!(
            organization = organization.as_str(),
            found = record.is_some(),
            "SCIM lookup for {username}"
        );
        Ok(record)
    }

    async fn init_flow(&self, organization: Organization) -> Result<FlowResponse> {
        let context = self.contexts.context_for(organization)?;
        let form = [
            ("client_id", context.client_id.as_str()),
            ("client_secret", context.client_secret.expose_secret()),
            ("response_type", "code"),
            ("redirect_uri", self.callback_url.as_str()),
            ("scope", "openid"),
            ("response_mode", "direct"),
        ];
        let response =
            http_client::send(self.client.post(&context.authorize_endpoint).form(&form)).await?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let body = http_client::body_snippet(response).await;
            bail!("Flow initiation failed with status {status}: {body}");
        }

        let flow: FlowResponse = response
            .json()
            .await
            .context("Failed to parse flow initiation response")?;
        if flow.flow_id().is_none() {
            bail!("flowId not found in flow initiation response");
        }
        Ok(flow)
    }

    async fn authenticate(
        &self,
        organization: Organization,
        request: &AuthnRequest,
    ) -> Result<FlowResponse> {
        let context = self.contexts.context_for(organization)?;
        let response =
            http_client::send(self.client.post(&context.authn_endpoint).json(request)).await?;

        // Error statuses still carry a flow document (e.g. FAILED).
        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            warn!("Flow authentication endpoint returned status {status}");
        }

        response
            .json()
            .await
            .context("Failed to parse flow authentication response")
    }
}
