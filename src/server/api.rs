//! REST API handlers
//!
//! Thin translation between HTTP and the document cache / refresh
//! coordinator. Handlers never touch the network themselves except through
//! `POST /api/refresh/{service}`, which awaits one service refresh.

use axum::{
    extract::{MatchedPath, Path, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::cache::{CacheError, CacheStats};
use crate::metrics;
use crate::refresh::RefreshError;

use super::app::AppState;

// ============================================================================
// API Response Types
// ============================================================================

/// Standard response envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: 0,
            message: "success".to_string(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// Successful response carrying only a message
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            code: 0,
            message: message.into(),
            data: None,
        }
    }

    /// Error response; `code` mirrors the HTTP status
    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code: status.as_u16(),
            message: message.into(),
            data: None,
        }
    }
}

/// Entry of `GET /api/services`, shaped for the portal front end
#[derive(Debug, Serialize)]
pub struct ServiceListing {
    pub name: String,
    pub title: String,
    pub description: String,
    pub status: String,
    pub healthy: bool,
    pub owner: String,
    pub tags: Vec<String>,
    #[serde(rename = "swaggerUrl")]
    pub swagger_url: String,
}

/// Liveness response of the hub itself
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub time: String,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub services: CacheStats,
}

/// Path at which a service's cached document is served
pub fn swagger_url(service: &str) -> String {
    format!("/api/docs/{service}/swagger.json")
}

// ============================================================================
// API Routes
// ============================================================================

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(prometheus_metrics))
        .route("/api/services", get(list_services))
        .route("/api/catalog", get(get_catalog))
        .route("/api/docs/{service}/swagger.json", get(get_service_doc))
        .route("/api/services/{service}", get(get_service_info))
        .route("/api/refresh", post(refresh_all))
        .route("/api/refresh/{service}", post(refresh_service))
        .route_layer(middleware::from_fn(track_requests))
        .with_state(state)
}

/// Count requests per route template and status
async fn track_requests(request: Request, next: Next) -> Response {
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;
    metrics::record_api_request(&endpoint, response.status().as_u16());
    response
}

// ============================================================================
// Health & Metrics Handlers
// ============================================================================

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        service: "docs-hub",
        time: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.start_time.elapsed().as_secs(),
        services: state.cache.stats().await,
    })
}

async fn prometheus_metrics() -> Response {
    match metrics::encode_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
        )
            .into_response(),
    }
}

// ============================================================================
// Catalog Handlers
// ============================================================================

/// List services for the portal front end
async fn list_services(State(state): State<AppState>) -> impl IntoResponse {
    let services: Vec<ServiceListing> = state
        .cache
        .get_catalog()
        .await
        .into_iter()
        .map(|s| ServiceListing {
            swagger_url: swagger_url(&s.name),
            name: s.name,
            title: s.display_name,
            description: s.description,
            status: s.status,
            healthy: s.healthy,
            owner: s.owner,
            tags: s.tags,
        })
        .collect();

    Json(services)
}

async fn get_catalog(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(state.cache.get_catalog().await))
}

/// Raw cached document of one service
async fn get_service_doc(
    State(state): State<AppState>,
    Path(service): Path<String>,
) -> Response {
    match state.cache.get_document(&service).await {
        Ok(document) => (StatusCode::OK, Json(document)).into_response(),
        Err(e) => not_found(e),
    }
}

/// Full record of one service, document included
async fn get_service_info(
    State(state): State<AppState>,
    Path(service): Path<String>,
) -> Response {
    match state.cache.get(&service).await {
        Ok(doc) => (StatusCode::OK, Json(ApiResponse::success(doc))).into_response(),
        Err(e) => not_found(e),
    }
}

fn not_found(err: CacheError) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::error(StatusCode::NOT_FOUND, err.to_string())),
    )
        .into_response()
}

// ============================================================================
// Refresh Handlers
// ============================================================================

/// Start a full refresh in the background
async fn refresh_all(State(state): State<AppState>) -> impl IntoResponse {
    // Outcome is logged by the coordinator
    let _ = state.coordinator.trigger_refresh_all();

    (StatusCode::ACCEPTED, Json(ApiResponse::message("Refresh started")))
}

/// Refresh one service and wait for the result
///
/// The refresh runs on its own task, so a client disconnect does not cancel
/// the cache update.
async fn refresh_service(
    State(state): State<AppState>,
    Path(service): Path<String>,
) -> impl IntoResponse {
    let result = match state.coordinator.spawn_refresh_service(&service).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(service = %service, error = %e, "Refresh task failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
            );
        }
    };

    match result {
        Ok(()) => (StatusCode::OK, Json(ApiResponse::message("Refresh completed"))),
        Err(e @ RefreshError::UnknownService(_)) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(StatusCode::NOT_FOUND, e.to_string())),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
        ),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_response_success() {
        let json = serde_json::to_value(ApiResponse::success(vec![1, 2])).unwrap();
        assert_eq!(json["code"], 0);
        assert_eq!(json["message"], "success");
        assert_eq!(json["data"], serde_json::json!([1, 2]));
    }

    #[test]
    fn test_api_response_message_omits_data() {
        let json = serde_json::to_value(ApiResponse::message("Refresh started")).unwrap();
        assert_eq!(json["code"], 0);
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_api_response_error() {
        let response = ApiResponse::error(StatusCode::NOT_FOUND, "service x not found");
        assert_eq!(response.code, 404);
        assert_eq!(response.message, "service x not found");
    }

    #[test]
    fn test_swagger_url() {
        assert_eq!(swagger_url("orders"), "/api/docs/orders/swagger.json");
    }

    #[test]
    fn test_service_listing_field_names() {
        let listing = ServiceListing {
            name: "orders".to_string(),
            title: "Order Service".to_string(),
            description: String::new(),
            status: "stable".to_string(),
            healthy: true,
            owner: "commerce".to_string(),
            tags: vec![],
            swagger_url: swagger_url("orders"),
        };
        let json = serde_json::to_value(&listing).unwrap();
        assert_eq!(json["swaggerUrl"], "/api/docs/orders/swagger.json");
        assert_eq!(json["title"], "Order Service");
    }
}
