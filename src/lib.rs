//! docs-hub - API documentation aggregator
//!
//! Polls a fixed set of backend services for liveness and their
//! OpenAPI/Swagger documents, keeps the last good document of each in
//! memory, and serves the catalog and documents over HTTP.
//!
//! # Architecture
//!
//! - [`registry`] - Static list of backend service descriptors
//! - [`fetcher`] - Single-attempt HTTP GET with a fixed timeout
//! - [`cache`] - Per-service cached state with per-entry locking
//! - [`refresh`] - Refresh cycles, on-demand refresh, recurring schedule
//! - [`config`] - YAML/TOML configuration and environment overrides
//! - [`server`] - axum routes over the cache and coordinator
//! - [`metrics`] - Prometheus metrics
//! - [`error`] - Unified error type
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use docs_hub::config::Config;
//! use docs_hub::refresh::RefreshCoordinator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(Path::new("configs/dev.yaml"))?;
//!     let coordinator = Arc::new(RefreshCoordinator::from_config(&config)?);
//!     let report = coordinator.refresh_all().await;
//!     println!("{} of {} services refreshed", report.succeeded.len(), report.total());
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod metrics;
pub mod refresh;
pub mod registry;
pub mod server;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::cache::{CachedDocument, DocumentCache, RefreshOutcome, ServiceSummary};
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, Result};
    pub use crate::fetcher::{Document, Fetcher, HttpFetcher};
    pub use crate::refresh::{RefreshCoordinator, RefreshReport};
    pub use crate::registry::{ServiceDescriptor, ServiceRegistry};
    pub use crate::server::HubServer;
}
