//! HTTP surface of the documentation hub
//!
//! ```text
//! GET  /health                          hub liveness
//! GET  /metrics                         Prometheus metrics
//! GET  /api/services                    portal listing
//! GET  /api/catalog                     catalog in the response envelope
//! GET  /api/docs/{service}/swagger.json raw cached document
//! GET  /api/services/{service}          full record in the response envelope
//! POST /api/refresh                     start a full refresh (202)
//! POST /api/refresh/{service}           refresh one service and wait
//! ```

pub mod api;
pub mod app;

pub use api::{create_router, ApiResponse};
pub use app::{AppState, HubServer, ServerError};
