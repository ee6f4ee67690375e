//! Common test utilities

use std::sync::Arc;
use std::time::Duration;

use docs_hub::cache::DocumentCache;
use docs_hub::fetcher::HttpFetcher;
use docs_hub::refresh::RefreshCoordinator;
use docs_hub::registry::{ServiceDescriptor, ServiceRegistry};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Minimal Swagger 2.0 document with the given title
pub fn sample_document(title: &str) -> Value {
    json!({
        "swagger": "2.0",
        "info": { "title": title, "version": "1.0.0" },
        "paths": {
            "/items": { "get": { "summary": "List items" } }
        }
    })
}

/// Mount `/health` and `/swagger.json` answering with the given statuses
pub async fn mount_backend(server: &MockServer, health_status: u16, doc: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(health_status))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/swagger.json"))
        .respond_with(doc)
        .mount(server)
        .await;
}

/// Backend that is healthy and serves a valid document
pub async fn healthy_backend(title: &str) -> MockServer {
    let server = MockServer::start().await;
    mount_backend(
        &server,
        200,
        ResponseTemplate::new(200).set_body_json(sample_document(title)),
    )
    .await;
    server
}

/// Coordinator over real HTTP with the given fetch timeout
pub fn coordinator(services: Vec<ServiceDescriptor>, timeout: Duration) -> Arc<RefreshCoordinator> {
    let registry = Arc::new(ServiceRegistry::new(services).expect("valid registry"));
    let cache = Arc::new(DocumentCache::new(&registry));
    let fetcher = Arc::new(HttpFetcher::with_timeout(timeout).expect("http client"));
    Arc::new(RefreshCoordinator::new(registry, cache, fetcher))
}

/// Address nothing listens on
#[allow(dead_code)]
pub const UNREACHABLE_URL: &str = "http://127.0.0.1:1";
