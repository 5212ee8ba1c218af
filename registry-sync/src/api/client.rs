//! HTTP client for the registry API
//!
//! One [`RegistryClient`] is created per run after the token has been acquired
//! and is shared by reference with every component that talks to the registry.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;

use super::auth::{Credentials, acquire_token};
use super::models::{CreateObjectRequest, SearchResponse};
use super::operations::{Operation, OperationResult};
use super::query::SearchQuery;

/// The request/response seam every registry call goes through
///
/// Transport failures surface as `Err`; a request that reached the registry but
/// was rejected is an `Ok(OperationResult)` with `success == false`.
#[async_trait]
pub trait RegistryBackend: Send + Sync {
    /// Run a search; a non-success status is an error since there is no envelope
    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse>;

    /// Execute a single mutation
    async fn execute(&self, operation: &Operation) -> Result<OperationResult>;
}

/// Connection settings for [`RegistryClient`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL, always ending in `/`
    pub base_url: String,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self { base_url, timeout }
    }
}

/// Authenticated registry session
pub struct RegistryClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl RegistryClient {
    /// Build the HTTP session and authenticate it
    pub async fn connect(config: &ClientConfig, credentials: &Credentials) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build HTTP client")?;

        let token = acquire_token(&http, &config.base_url, credentials).await?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            token: token.access_token,
        })
    }

    /// Release the session. Consumes the client so no call can follow.
    pub fn close(self) {
        drop(self.http);
        log::info!("Session is closed");
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .header("Accept", "application/json")
            .header("Content-Type", "application/json-patch+json")
            .bearer_auth(&self.token)
    }
}

#[async_trait]
impl RegistryBackend for RegistryClient {
    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse> {
        let path = format!("api/objects/search?{}", query.query_string());
        let body = serde_json::to_string(query).context("Failed to serialize search query")?;

        // Search is a POST with a body that the API treats as GET
        let response = self
            .request(reqwest::Method::POST, &path)
            .header("X-HTTP-Method-Override", "GET")
            .body(body)
            .send()
            .await
            .with_context(|| format!("Search request failed: {}", path))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("Search returned {}: {}", status, text);
        }

        response
            .json::<SearchResponse>()
            .await
            .context("Failed to parse search response")
    }

    async fn execute(&self, operation: &Operation) -> Result<OperationResult> {
        let path = operation.path();
        let builder = match operation {
            Operation::Create { class, name, .. } => {
                let body = serde_json::to_string(&CreateObjectRequest::new(class, name))?;
                self.request(reqwest::Method::POST, &path).body(body)
            }
            Operation::PutAttributes { attributes, .. } => {
                let body = serde_json::to_string(attributes)?;
                self.request(reqwest::Method::PUT, &path).body(body)
            }
            Operation::Delete { .. } => self.request(reqwest::Method::DELETE, &path),
        };

        let response = builder.send().await.with_context(|| {
            format!(
                "{} {} failed",
                operation.http_method(),
                path
            )
        })?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if status.is_success() {
            let data = if text.trim().is_empty() {
                None
            } else {
                serde_json::from_str(&text).ok()
            };
            Ok(OperationResult::success(operation.clone(), data))
        } else {
            Ok(OperationResult::error(
                operation.clone(),
                text,
                Some(status.as_u16()),
            ))
        }
    }
}
