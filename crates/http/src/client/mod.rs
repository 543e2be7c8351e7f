//! Helpdesk HTTP transport
//!
//! [`HelpdeskClient`] knows the base URL and how to turn responses into typed
//! results. It never attaches credentials by itself; authenticated traffic
//! goes through [`crate::session::SessionManager`].

pub mod auth;
pub mod error;

use error::{ClientError, extract_message};
use reqwest::{Client, ClientBuilder, Response};
use std::time::Duration;

/// Default user agent sent with every request
pub const USER_AGENT: &str = concat!("chamados-client/", env!("CARGO_PKG_VERSION"));

/// Helpdesk API client
#[derive(Clone, Debug)]
pub struct HelpdeskClient {
    client: Client,
    base_url: String,
}

impl HelpdeskClient {
    /// Create a new client with default configuration
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder().base_url(base_url).build()
    }

    /// Create a new client builder
    pub fn builder() -> HelpdeskClientBuilder {
        HelpdeskClientBuilder::default()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create a request builder for `path`, relative to the base URL
    pub fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client.request(method, url)
    }
}

/// Turn a response into `T`, mapping non-success statuses to [`ClientError`]
pub async fn decode_response<T: serde::de::DeserializeOwned>(
    response: Response,
) -> Result<T, ClientError> {
    let status = response.status();

    if status.is_success() {
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    } else {
        Err(error_from_response(response).await)
    }
}

/// Like [`decode_response`] for endpoints that answer without a body
pub async fn check_response(response: Response) -> Result<(), ClientError> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(error_from_response(response).await)
    }
}

pub(crate) async fn error_from_response(response: Response) -> ClientError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    ClientError::from_status(status, extract_message(status, &body))
}

/// Builder for HelpdeskClient
#[derive(Default)]
pub struct HelpdeskClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl HelpdeskClientBuilder {
    /// Set the base URL, e.g. `http://localhost:8001/api`
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the client
    pub fn build(self) -> Result<HelpdeskClient, ClientError> {
        let raw = self
            .base_url
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;

        let base_url = chamados_core::parse_base_url(&raw)
            .map_err(|e| ClientError::Configuration(e.to_string()))?;

        let mut client_builder = ClientBuilder::new()
            .user_agent(self.user_agent.unwrap_or_else(|| USER_AGENT.to_string()));

        if let Some(timeout) = self.timeout {
            client_builder = client_builder.timeout(timeout);
        }

        let client = client_builder.build()?;

        Ok(HelpdeskClient { client, base_url })
    }
}
