//! Error types for backend fetches

use thiserror::Error;

/// Errors that can occur while fetching from a backend service
#[derive(Error, Debug)]
pub enum FetchError {
    /// The request could not be sent, the connection failed or timed out
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The backend answered with a non-200 status
    #[error("failed to fetch doc from {url}: status {status}")]
    Status { url: String, status: u16 },

    /// The body is not a JSON object
    #[error("invalid document from {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// The response body is larger than the configured limit
    #[error("response from {url} exceeds {limit} bytes")]
    TooLarge { url: String, limit: usize },

    /// The HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

impl FetchError {
    /// URL of the failed request, if the error belongs to one
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Transport { url, .. }
            | Self::Status { url, .. }
            | Self::Parse { url, .. }
            | Self::TooLarge { url, .. } => Some(url),
            Self::Client(_) => None,
        }
    }

    /// Whether the transport failure was a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport { source, .. } if source.is_timeout())
    }

    /// Short label used for metrics and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "transport",
            Self::Status { .. } => "status",
            Self::Parse { .. } => "parse",
            Self::TooLarge { .. } => "too_large",
            Self::Client(_) => "client",
        }
    }
}
