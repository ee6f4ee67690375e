//! Unified error handling for the docs-hub crate
//!
//! Each module defines its own error type; this module wraps them in a
//! single [`Error`] for callers that cross module boundaries.
//!
//! - [`FetchError`] - backend transport, status and JSON failures
//! - [`CacheError`] - unknown service, or document never fetched
//! - [`RefreshError`] - outcome of a single-service refresh
//! - [`ConfigError`] / [`RegistryError`] - startup configuration problems

use std::io;
use thiserror::Error;

pub use crate::cache::CacheError;
pub use crate::config::ConfigError;
pub use crate::fetcher::FetchError;
pub use crate::refresh::RefreshError;
pub use crate::registry::RegistryError;

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Backend unreachable, timed out, or answered with an error status
    Network,
    /// Backend answered with something that is not a JSON object
    Parsing,
    /// Unknown service or missing document
    Lookup,
    /// Configuration and validation errors
    Config,
    /// HTTP server startup and I/O errors
    Server,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Parsing => "parsing",
            Self::Lookup => "lookup",
            Self::Config => "config",
            Self::Server => "server",
        }
    }
}

/// Unified error type for the docs-hub crate
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Refresh(#[from] RefreshError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Server error: {0}")]
    Server(String),
}

impl Error {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Fetch(e) | Self::Refresh(RefreshError::Fetch(e)) => fetch_category(e),
            Self::Cache(_)
            | Self::Refresh(RefreshError::UnknownService(_))
            | Self::Refresh(RefreshError::Cache(_)) => ErrorCategory::Lookup,
            Self::Config(_) | Self::Registry(_) => ErrorCategory::Config,
            Self::Io(_) | Self::Server(_) => ErrorCategory::Server,
        }
    }

    /// Whether the next refresh cycle may succeed without operator action
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Network | ErrorCategory::Parsing
        ) || matches!(self, Self::Cache(CacheError::NotReady(_)))
    }
}

fn fetch_category(err: &FetchError) -> ErrorCategory {
    match err {
        FetchError::Parse { .. } | FetchError::TooLarge { .. } => ErrorCategory::Parsing,
        FetchError::Transport { .. } | FetchError::Status { .. } => ErrorCategory::Network,
        FetchError::Client(_) => ErrorCategory::Config,
    }
}

/// Result type alias using the unified error
pub type Result<T> = std::result::Result<T, Error>;
