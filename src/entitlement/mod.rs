//! Entitlement resolver backed by the subscription service.

use crate::http_client;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::{header::ACCEPT, Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

const PLACEHOLDER: &str = "%s";

/// URL with a single `%s` placeholder replaced by a query-escaped value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate(String);

impl UrlTemplate {
    /// # Errors
    /// Returns an error if the template has no `%s` placeholder.
    pub fn parse(template: &str) -> Result<Self> {
        if !template.contains(PLACEHOLDER) {
            bail!("URL template must contain a {PLACEHOLDER} placeholder: {template}");
        }
        Ok(Self(template.to_string()))
    }

    #[must_use]
    pub fn render(&self, value: &str) -> String {
        let escaped: String = url::form_urlencoded::byte_serialize(value.as_bytes()).collect();
        self.0.replacen(PLACEHOLDER, &escaped, 1)
    }
}

#[async_trait]
pub trait EntitlementResolver: Send + Sync {
    /// Lower-cased project keys the user is entitled to. Empty for non-customers.
    async fn folders_for(&self, username: &str) -> Result<Vec<String>>;

    async fn is_valid_project_key(&self, project_key: &str) -> Result<bool>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FolderResponse {
    #[serde(default)]
    is_valid_customer: bool,
    #[serde(default)]
    project_keys: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SubscriptionClient {
    client: Client,
    subscription_api: UrlTemplate,
    project_api: UrlTemplate,
}

impl SubscriptionClient {
    #[must_use]
    pub fn new(client: Client, subscription_api: UrlTemplate, project_api: UrlTemplate) -> Self {
        Self {
            client,
            subscription_api,
            project_api,
        }
    }
}

#[async_trait]
impl EntitlementResolver for SubscriptionClient {
    async fn folders_for(&self, username: &str) -> Result<Vec<String>> {
        let url = self.subscription_api.render(username);
        let response =
            http_client::send(self.client.get(url).header(ACCEPT, "application/json")).await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = http_client::body_snippet(response).await;
            bail!("Folder list lookup for {username} returned status {status}: {body}");
        }

        let folders: FolderResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to decode folder list for {username}"))?;

        if !folders.is_valid_customer {
            debug!("{username} is not a valid customer");
            return Ok(Vec::new());
        }

        let keys: Vec<String> = folders
            .project_keys
            .iter()
            .map(|key| key.to_lowercase())
            .collect();
        debug!("Retrieved {} folders for {username}", keys.len());
        Ok(keys)
    }

    async fn is_valid_project_key(&self, project_key: &str) -> Result<bool> {
        let url = self.project_api.render(project_key);
        let response =
            http_client::send(self.client.get(url).header(ACCEPT, "application/json")).await?;

        let valid = response.status() == StatusCode::OK;
        debug!(
            "Project key {project_key} validation returned {}",
            response.status()
        );
        Ok(valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base: &str) -> Result<SubscriptionClient> {
        Ok(SubscriptionClient::new(
            http_client::build(Duration::from_secs(5))?,
            UrlTemplate::parse(&format!("{base}/subscriptions?email=%s"))?,
            UrlTemplate::parse(&format!("{base}/projects/%s"))?,
        ))
    }

    #[test]
    fn template_requires_placeholder() {
        assert!(UrlTemplate::parse("https://api.example.com/users").is_err());
        assert!(UrlTemplate::parse("https://api.example.com/users/%s").is_ok());
    }

    #[test]
    fn template_escapes_value() -> Result<()> {
        let template = UrlTemplate::parse("https://api.example.com/users?email=%s")?;
        assert_eq!(
            template.render("jane+doe@acme.io"),
            "https://api.example.com/users?email=jane%2Bdoe%40acme.io"
        );
        assert_eq!(
            template.render("a b&c"),
            "https://api.example.com/users?email=a+b%26c"
        );
        Ok(())
    }

    #[tokio::test]
    async fn folders_are_lower_cased() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/subscriptions"))
            .and(query_param("email", "jane@acme.io"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "isValidCustomer": true,
                "projectKeys": ["PROJA", "projB"]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let folders = client(&server.uri())?.folders_for("jane@acme.io").await?;
        assert_eq!(folders, vec!["proja", "projb"]);
        Ok(())
    }

    #[tokio::test]
    async fn non_customer_has_no_folders() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/subscriptions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "isValidCustomer": false,
                "projectKeys": ["PROJA"]
            })))
            .mount(&server)
            .await;

        assert!(client(&server.uri())?
            .folders_for("jane@acme.io")
            .await?
            .is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn folder_lookup_error_status() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        assert!(client(&server.uri())?
            .folders_for("jane@acme.io")
            .await
            .is_err());
        Ok(())
    }

    #[tokio::test]
    async fn project_key_validation() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects/proj1"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/projects/nope"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client(&server.uri())?;
        assert!(client.is_valid_project_key("proj1").await?);
        assert!(!client.is_valid_project_key("nope").await?);
        Ok(())
    }
}
