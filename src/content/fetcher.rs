//! HTTP fetcher implementation
//!
//! This module handles all outbound requests for the pipeline:
//! - Building the HTTP client with user agent and timeouts
//! - GET requests for article pages
//! - Error classification into per-job failures

use crate::config::{PipelineConfig, UserAgentConfig};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

/// Per-job fetch failures
///
/// None of these are fatal to a run; the owning worker records the failure
/// and moves on to its next job.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP status {code}")]
    Status { code: u16 },

    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl FetchError {
    /// Returns true if the server answered with a non-success status
    pub fn is_status(&self) -> bool {
        matches!(self, Self::Status { .. })
    }
}

/// Fetches raw page bytes for a URL
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Timeouts and identity used by [`HttpFetcher`]
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub user_agent: String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl FetchSettings {
    /// Derives fetch settings from configuration sections
    pub fn from_config(user_agent: &UserAgentConfig, pipeline: &PipelineConfig) -> Self {
        Self {
            user_agent: user_agent.header_value(),
            request_timeout: Duration::from_millis(pipeline.fetch_timeout_ms),
            connect_timeout: Duration::from_millis(pipeline.connect_timeout_ms),
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `settings` - User agent and timeouts
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(settings: &FetchSettings) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(settings.user_agent.as_str())
        .timeout(settings.request_timeout)
        .connect_timeout(settings.connect_timeout)
        .gzip(true)
        .brotli(true)
        .build()
}

/// reqwest-backed [`ContentFetcher`]
///
/// One client is shared by every worker so connections are pooled.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates a fetcher with a freshly built client
    pub fn new(settings: &FetchSettings) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(settings)?,
        })
    }
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    /// Fetches a URL with a single GET
    ///
    /// | Condition | Result |
    /// |-----------|--------|
    /// | 2xx | body bytes |
    /// | any other status | `Status { code }` |
    /// | timeout | `Timeout` |
    /// | DNS / connection refused / TLS | `Connect` |
    /// | unparseable URL | `InvalidUrl` |
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let parsed = url::Url::parse(url).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(classify_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                code: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(classify_error)?;
        Ok(body.to_vec())
    }
}

/// Classifies a reqwest error into a fetch failure
fn classify_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else if e.is_connect() {
        FetchError::Connect(e.to_string())
    } else {
        FetchError::Transport(e.to_string())
    }
}
