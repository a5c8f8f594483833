//! HTTP client for the remote monitoring API.
//!
//! Every request carries HTTP basic credentials plus the application key
//! header. One [`reqwest::Client`] is built up front and shared by all
//! workers; reqwest clients are internally reference counted and safe to use
//! concurrently.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::types::{
    ChecksResponse, ErrorResponse, Monitor, Probe, ProbesResponse, ResultRecord, ResultsResponse,
};
use super::ResultsApi;
use crate::error::ApiError;
use crate::fetch::Window;

/// Default API endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.pingdom.com/api/2.0";

/// Header carrying the application key.
const APP_KEY_HEADER: &str = "App-Key";

/// Authenticated client for the monitoring API.
#[derive(Clone)]
pub struct HttpApi {
    client: Client,
    endpoint: String,
    username: String,
    password: String,
    app_key: String,
}

impl HttpApi {
    /// Create a new builder for configuring the client.
    pub fn builder() -> HttpApiBuilder {
        HttpApiBuilder::default()
    }

    /// Returns the configured endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.endpoint, path);
        debug!(%url, ?query, "GET");

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .header(APP_KEY_HEADER, &self.app_key)
            .query(query)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }
}

impl fmt::Debug for HttpApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpApi")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("password", &"***REDACTED***")
            .field("app_key", &"***REDACTED***")
            .finish()
    }
}

#[async_trait]
impl ResultsApi for HttpApi {
    async fn checks(&self) -> Result<Vec<Monitor>, ApiError> {
        let body: ChecksResponse = self.get("/checks", &[]).await?;
        Ok(body.checks)
    }

    async fn probes(&self) -> Result<Vec<Probe>, ApiError> {
        let body: ProbesResponse = self
            .get("/probes", &[("includedeleted", "true".to_string())])
            .await?;
        Ok(body.probes)
    }

    async fn results(
        &self,
        monitor_id: u64,
        window: Window,
    ) -> Result<Vec<ResultRecord>, ApiError> {
        let path = format!("/results/{}", monitor_id);
        let query = [
            ("from", window.from.to_string()),
            ("to", window.to.to_string()),
        ];
        let body: ResultsResponse = self.get(&path, &query).await?;
        Ok(body.results)
    }
}

// Prefer the service's own error message; fall back to the raw body.
async fn status_error(response: Response) -> ApiError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    ApiError::Status {
        status,
        message: error_message(&body),
    }
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(parsed) => parsed.error.errormessage,
        Err(_) => body.trim().to_string(),
    }
}

/// Builder for [`HttpApi`].
#[derive(Debug, Default)]
pub struct HttpApiBuilder {
    endpoint: Option<String>,
    username: Option<String>,
    password: Option<String>,
    app_key: Option<String>,
    timeout: Option<Duration>,
}

impl HttpApiBuilder {
    /// Set the API endpoint (default: [`DEFAULT_ENDPOINT`]).
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the username and password for basic authentication.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set the application key.
    pub fn app_key(mut self, key: impl Into<String>) -> Self {
        self.app_key = Some(key.into());
        self
    }

    /// Set the request timeout (default: 30 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<HttpApi, ApiError> {
        let timeout = self.timeout.unwrap_or(Duration::from_secs(30));

        let client = Client::builder().timeout(timeout).build()?;

        let endpoint = self
            .endpoint
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(HttpApi {
            client,
            endpoint,
            username: self.username.unwrap_or_default(),
            password: self.password.unwrap_or_default(),
            app_key: self.app_key.unwrap_or_default(),
        })
    }
}
