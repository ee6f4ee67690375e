//! HTTP server wiring
//!
//! Holds the shared application state and runs the axum server until the
//! shutdown token fires.

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::cache::DocumentCache;
use crate::config::ServerConfig;
use crate::refresh::RefreshCoordinator;

use super::api::create_router;

// ============================================================================
// App State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Refresh engine, for on-demand refreshes
    pub coordinator: Arc<RefreshCoordinator>,

    /// Document cache, for reads
    pub cache: Arc<DocumentCache>,

    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    pub fn new(coordinator: Arc<RefreshCoordinator>) -> Self {
        Self {
            cache: Arc::clone(coordinator.cache()),
            coordinator,
            start_time: Instant::now(),
        }
    }
}

// ============================================================================
// Server Errors
// ============================================================================

#[derive(Error, Debug)]
pub enum ServerError {
    /// Failed to bind to address
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The server stopped with an I/O error
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

impl From<ServerError> for crate::error::Error {
    fn from(err: ServerError) -> Self {
        Self::Server(err.to_string())
    }
}

// ============================================================================
// Hub Server
// ============================================================================

/// HTTP front end of the documentation hub
pub struct HubServer {
    config: ServerConfig,
    state: AppState,
}

impl HubServer {
    pub fn new(config: ServerConfig, coordinator: Arc<RefreshCoordinator>) -> Self {
        Self {
            config,
            state: AppState::new(coordinator),
        }
    }

    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Build the router with all routes and configured layers
    pub fn build_router(&self) -> Router {
        let mut router = create_router(self.state.clone());

        if self.config.enable_cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }

        if self.config.enable_request_logging {
            router = router.layer(TraceLayer::new_for_http());
        }

        router
    }

    /// `host:port` from the server configuration
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    /// Bind the configured address and serve until `shutdown` is cancelled
    pub async fn serve(&self, shutdown: CancellationToken) -> Result<(), ServerError> {
        let addr = self.address();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        self.serve_on(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` is cancelled
    pub async fn serve_on(
        &self,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> Result<(), ServerError> {
        if let Ok(local) = listener.local_addr() {
            tracing::info!("Docs Hub listening on {}", local);
        }

        axum::serve(listener, self.build_router())
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await
            .map_err(ServerError::Serve)?;

        tracing::info!("Docs Hub server shutdown complete");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
