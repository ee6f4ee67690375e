//! Backend fetcher for health checks and API documents
//!
//! Every network call made by the hub goes through a [`Fetcher`]: a single
//! GET with a client-wide timeout and no retries. The trait provides the two
//! higher-level operations used by the refresh coordinator:
//!
//! - [`Fetcher::check_health`] - `true` only for a 200 response
//! - [`Fetcher::fetch_document`] - a parsed JSON object, or a [`FetchError`]

pub mod error;

pub use error::FetchError;

use async_trait::async_trait;
use reqwest::{header::USER_AGENT, Client, StatusCode};
use std::time::Duration;

/// An API document: an arbitrary JSON object
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Default timeout for every backend request
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default cap on a fetched response body
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Raw result of one GET
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

// ============================================================================
// Fetcher trait
// ============================================================================

/// Performs single-attempt GET requests against backend services
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// GET `url` and return the status code and body
    async fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError>;

    /// GET `url` and return only the status code
    async fn status(&self, url: &str) -> Result<u16, FetchError> {
        Ok(self.fetch(url).await?.status)
    }

    /// Health check: healthy only if the request succeeds with status 200
    ///
    /// The response body is never inspected.
    async fn check_health(&self, url: &str) -> bool {
        match self.status(url).await {
            Ok(status) => status == StatusCode::OK.as_u16(),
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "Health check failed");
                false
            }
        }
    }

    /// Fetch and parse an API document
    async fn fetch_document(&self, url: &str) -> Result<Document, FetchError> {
        let response = self.fetch(url).await?;

        if response.status != StatusCode::OK.as_u16() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status,
            });
        }

        serde_json::from_slice::<Document>(&response.body).map_err(|source| FetchError::Parse {
            url: url.to_string(),
            source,
        })
    }
}

// ============================================================================
// HTTP Fetcher
// ============================================================================

/// reqwest-backed fetcher sharing one client across all services
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
    max_body_bytes: usize,
}

impl HttpFetcher {
    /// Create a fetcher with the default 10 second timeout
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Client` if the HTTP client cannot be created
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeout(DEFAULT_FETCH_TIMEOUT)
    }

    /// Create a fetcher with a custom request timeout
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Client` if the HTTP client cannot be created
    pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).gzip(true).build()?;
        Ok(Self {
            client,
            timeout,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        })
    }

    /// Reject response bodies larger than `limit` bytes
    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    async fn send(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        tracing::debug!(url = %url, "Fetching");

        self.client
            .get(url)
            .header(USER_AGENT, concat!("docs-hub/", env!("CARGO_PKG_VERSION")))
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError> {
        let mut response = self.send(url).await?;
        let status = response.status().as_u16();

        let too_large = || FetchError::TooLarge {
            url: url.to_string(),
            limit: self.max_body_bytes,
        };

        if response
            .content_length()
            .is_some_and(|len| len > self.max_body_bytes as u64)
        {
            return Err(too_large());
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })? {
            if body.len() + chunk.len() > self.max_body_bytes {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }

        Ok(FetchResponse { status, body })
    }

    async fn status(&self, url: &str) -> Result<u16, FetchError> {
        // Dropping the response abandons the body unread
        Ok(self.send(url).await?.status().as_u16())
    }
}

// ============================================================================
// Tests
// ============================================================================
