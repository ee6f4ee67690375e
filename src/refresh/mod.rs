//! Refresh coordinator
//!
//! Drives every write into the [`DocumentCache`]. A refresh of one service
//! runs its health check and document fetch, then records the outcome in a
//! single atomic cache update. A full cycle fans one such task out per
//! registered service and waits for all of them.
//!
//! # Triggers
//!
//! ```text
//!  startup ──► refresh_all() (awaited before serving)
//!  timer ────► refresh_all() every `refresh_interval`
//!  POST /api/refresh ─────────► trigger_refresh_all() (detached)
//!  POST /api/refresh/{name} ──► refresh_service(name) (awaited)
//! ```
//!
//! Triggers may overlap. Per-entry write locks in the cache keep every
//! entry consistent; the last applied write wins.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::cache::{CacheError, DocumentCache, RefreshOutcome};
use crate::config::Config;
use crate::fetcher::{FetchError, Fetcher, HttpFetcher};
use crate::metrics;
use crate::registry::{ServiceDescriptor, ServiceRegistry};

/// Default period of the recurring refresh
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);

// ============================================================================
// Errors
// ============================================================================

/// Errors returned by a single-service refresh
#[derive(Error, Debug)]
pub enum RefreshError {
    /// The name is not in the registry
    #[error("service {0} not found")]
    UnknownService(String),

    /// The document fetch failed; health and timestamp were still recorded
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Any other cache failure; lookups by name map to `UnknownService`
    #[error(transparent)]
    Cache(CacheError),
}

impl From<CacheError> for RefreshError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::NotFound(name) => Self::UnknownService(name),
            other => Self::Cache(other),
        }
    }
}

// ============================================================================
// Refresh Report
// ============================================================================

/// A service whose document fetch failed during a cycle
#[derive(Debug, Clone, Serialize)]
pub struct ServiceFailure {
    pub name: String,
    pub error: String,
}

/// Summary of one full refresh cycle
#[derive(Debug, Clone, Serialize)]
pub struct RefreshReport {
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    pub succeeded: Vec<String>,
    pub failed: Vec<ServiceFailure>,
}

impl RefreshReport {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// True when every document fetch in the cycle succeeded
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

// ============================================================================
// Refresh Coordinator
// ============================================================================

/// Orchestrates refresh cycles over the registry
pub struct RefreshCoordinator {
    registry: Arc<ServiceRegistry>,
    cache: Arc<DocumentCache>,
    fetcher: Arc<dyn Fetcher>,
}

impl RefreshCoordinator {
    pub fn new(
        registry: Arc<ServiceRegistry>,
        cache: Arc<DocumentCache>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            registry,
            cache,
            fetcher,
        }
    }

    /// Build registry, cache and HTTP fetcher from configuration
    pub fn from_config(config: &Config) -> crate::error::Result<Self> {
        let registry = Arc::new(config.registry()?);
        let cache = Arc::new(DocumentCache::new(&registry));
        let fetcher = Arc::new(
            HttpFetcher::with_timeout(config.fetch_timeout())?
                .with_max_body_bytes(config.fetcher.max_body_bytes),
        );
        Ok(Self::new(registry, cache, fetcher))
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<DocumentCache> {
        &self.cache
    }

    /// Refresh one service and report its document-fetch error, if any
    ///
    /// The cache entry is updated before this returns, whether or not the
    /// fetch succeeded.
    pub async fn refresh_service(&self, name: &str) -> Result<(), RefreshError> {
        let descriptor = self
            .registry
            .get(name)
            .ok_or_else(|| RefreshError::UnknownService(name.to_string()))?;

        self.refresh_descriptor(descriptor).await
    }

    /// Refresh one service on its own task and return the handle
    ///
    /// The cache write happens even if the caller stops awaiting the handle,
    /// e.g. when an HTTP client disconnects mid-request.
    pub fn spawn_refresh_service(
        self: &Arc<Self>,
        name: &str,
    ) -> JoinHandle<Result<(), RefreshError>> {
        let coordinator = Arc::clone(self);
        let name = name.to_string();
        tokio::spawn(async move { coordinator.refresh_service(&name).await })
    }

    /// Refresh every registered service concurrently
    ///
    /// Waits for all per-service tasks. Failures are logged and collected in
    /// the report; they never cut the cycle short.
    pub async fn refresh_all(&self) -> RefreshReport {
        let _timer = metrics::start_cycle_timer();
        let started_at = Utc::now();
        let start = Instant::now();

        let tasks = self.registry.iter().map(|descriptor| async move {
            let result = self.refresh_descriptor(descriptor).await;
            (descriptor.name.clone(), result)
        });
        let results = futures::future::join_all(tasks).await;

        let mut report = RefreshReport {
            started_at,
            duration: Duration::ZERO,
            succeeded: Vec::with_capacity(results.len()),
            failed: Vec::new(),
        };
        for (name, result) in results {
            match result {
                Ok(()) => report.succeeded.push(name),
                Err(e) => report.failed.push(ServiceFailure {
                    name,
                    error: e.to_string(),
                }),
            }
        }
        report.duration = start.elapsed();

        metrics::record_cycle(report.succeeded.len(), report.failed.len());
        tracing::info!(
            total = report.total(),
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            duration_ms = report.duration.as_millis() as u64,
            "Refresh cycle completed"
        );

        report
    }

    /// Start a full cycle in the background and return immediately
    pub fn trigger_refresh_all(self: &Arc<Self>) -> JoinHandle<RefreshReport> {
        let coordinator = Arc::clone(self);
        tokio::spawn(async move { coordinator.refresh_all().await })
    }

    /// Run a full cycle every `period` until `cancel` fires
    ///
    /// The first cycle runs one full period after the call; the startup
    /// refresh is expected to have been awaited already. A cycle in flight
    /// when the token fires is finished before the loop exits.
    pub fn spawn_schedule(
        self: &Arc<Self>,
        period: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let coordinator = Arc::clone(self);
        let period = if period.is_zero() {
            DEFAULT_REFRESH_INTERVAL
        } else {
            period
        };

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            tracing::info!(interval_secs = period.as_secs_f64(), "Refresh schedule started");

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        tracing::info!("Refreshing all service docs");
                        coordinator.refresh_all().await;
                    }
                }
            }

            tracing::info!("Refresh schedule stopped");
        })
    }

    async fn refresh_descriptor(&self, descriptor: &ServiceDescriptor) -> Result<(), RefreshError> {
        let health_url = descriptor.health_url();
        let doc_url = descriptor.doc_url();

        let (healthy, fetched) = tokio::join!(
            self.fetcher.check_health(&health_url),
            self.fetcher.fetch_document(&doc_url),
        );

        let (outcome, result) = match fetched {
            Ok(document) => (RefreshOutcome::fetched(healthy, document), Ok(())),
            Err(e) => (RefreshOutcome::unchanged(healthy), Err(e)),
        };

        if let Err(e) = self.cache.apply_refresh_result(&descriptor.name, outcome).await {
            // Registry and cache are built from the same list
            tracing::error!(service = %descriptor.name, error = %e, "Cache has no entry for registered service");
            return Err(e.into());
        }

        match &result {
            Ok(()) => {
                tracing::info!(service = %descriptor.name, healthy, "Successfully refreshed docs");
                metrics::record_service_refresh(&descriptor.name, healthy, true, "success");
            }
            Err(e) => {
                tracing::warn!(
                    service = %descriptor.name,
                    healthy,
                    kind = e.kind(),
                    timeout = e.is_timeout(),
                    error = %e,
                    "Failed to refresh docs"
                );
                let cached = self.cache.get_document(&descriptor.name).await.is_ok();
                metrics::record_service_refresh(&descriptor.name, healthy, cached, e.kind());
            }
        }

        result.map_err(RefreshError::from)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::FetchResponse;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Fetcher answering from a mutable URL -> (status, body) table
    #[derive(Default)]
    struct ScriptedFetcher {
        routes: Mutex<HashMap<String, (u16, String)>>,
        calls: AtomicUsize,
    }

    impl ScriptedFetcher {
        fn route(&self, url: &str, status: u16, body: &str) {
            self.routes
                .lock()
                .unwrap()
                .insert(url.to_string(), (status, body.to_string()));
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Fetcher for ScriptedFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let route = self.routes.lock().unwrap().get(url).cloned();
            Ok(match route {
                Some((status, body)) => FetchResponse {
                    status,
                    body: body.into_bytes(),
                },
                None => FetchResponse {
                    status: 404,
                    body: Vec::new(),
                },
            })
        }
    }

    fn setup(names: &[&str]) -> (Arc<RefreshCoordinator>, Arc<ScriptedFetcher>) {
        let registry = Arc::new(
            ServiceRegistry::new(
                names
                    .iter()
                    .map(|n| ServiceDescriptor::new(*n, format!("http://{n}")))
                    .collect(),
            )
            .unwrap(),
        );
        let cache = Arc::new(DocumentCache::new(&registry));
        let fetcher = Arc::new(ScriptedFetcher::default());
        let coordinator = Arc::new(RefreshCoordinator::new(registry, cache, fetcher.clone()));
        (coordinator, fetcher)
    }

    #[tokio::test]
    async fn test_refresh_all_populates_every_entry() {
        let (coordinator, fetcher) = setup(&["orders", "users"]);
        fetcher.route("http://orders/health", 200, "ok");
        fetcher.route("http://orders/swagger.json", 200, r#"{"openapi":"3.0.0"}"#);
        fetcher.route("http://users/health", 503, "");

        let report = coordinator.refresh_all().await;

        assert_eq!(report.total(), 2);
        assert_eq!(report.succeeded, vec!["orders"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].name, "users");

        let cache = coordinator.cache();
        assert_eq!(cache.len(), 2);

        let orders = cache.get("orders").await.unwrap();
        assert!(orders.healthy);
        assert!(orders.last_updated.is_some());
        assert_eq!(cache.get_document("orders").await.unwrap()["openapi"], "3.0.0");

        let users = cache.get("users").await.unwrap();
        assert!(!users.healthy);
        assert!(users.last_updated.is_some());
        assert_eq!(
            cache.get_document("users").await.unwrap_err(),
            CacheError::NotReady("users".to_string())
        );
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_stale_document() {
        let (coordinator, fetcher) = setup(&["orders"]);
        fetcher.route("http://orders/health", 200, "ok");
        fetcher.route("http://orders/swagger.json", 200, r#"{"openapi":"3.0.0"}"#);
        coordinator.refresh_service("orders").await.unwrap();
        let first = coordinator.cache().get("orders").await.unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;
        fetcher.route("http://orders/swagger.json", 500, "boom");
        let err = coordinator.refresh_service("orders").await.unwrap_err();
        assert!(matches!(err, RefreshError::Fetch(FetchError::Status { status: 500, .. })));

        let second = coordinator.cache().get("orders").await.unwrap();
        assert!(second.healthy);
        assert!(second.last_updated > first.last_updated);
        assert_eq!(second.document.unwrap()["openapi"], "3.0.0");
    }

    #[tokio::test]
    async fn test_invalid_json_keeps_stale_document() {
        let (coordinator, fetcher) = setup(&["orders"]);
        fetcher.route("http://orders/swagger.json", 200, r#"{"openapi":"3.0.0"}"#);
        coordinator.refresh_service("orders").await.unwrap();

        fetcher.route("http://orders/swagger.json", 200, "not json");
        let err = coordinator.refresh_service("orders").await.unwrap_err();
        assert!(matches!(err, RefreshError::Fetch(FetchError::Parse { .. })));
        assert_eq!(
            coordinator.cache().get_document("orders").await.unwrap()["openapi"],
            "3.0.0"
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_overlapping_refreshes_record_whole_observations() {
        let (coordinator, fetcher) = setup(&["orders", "users"]);
        let mut previous = None;
        let mut last_good_round = None;

        for round in 0..20u32 {
            let up = round % 3 != 2;
            if up {
                fetcher.route("http://orders/health", 200, "ok");
                fetcher.route(
                    "http://orders/swagger.json",
                    200,
                    &format!(r#"{{"round":{round}}}"#),
                );
                last_good_round = Some(round);
            } else {
                fetcher.route("http://orders/health", 503, "");
                fetcher.route("http://orders/swagger.json", 500, "down");
            }

            let (_, single) = tokio::join!(
                coordinator.refresh_all(),
                coordinator.refresh_service("orders"),
            );
            assert_eq!(single.is_ok(), up);

            let entry = coordinator.cache().get("orders").await.unwrap();
            assert_eq!(entry.healthy, up, "round {round}");
            assert!(entry.last_updated > previous, "round {round}");
            previous = entry.last_updated;

            let document = entry.document.expect("document retained after first success");
            assert_eq!(document["round"].as_u64(), last_good_round.map(u64::from));

            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }

    #[tokio::test]
    async fn test_spawned_refresh_survives_dropped_caller() {
        let (coordinator, fetcher) = setup(&["orders"]);
        fetcher.route("http://orders/health", 200, "ok");
        fetcher.route("http://orders/swagger.json", 200, r#"{"openapi":"3.0.0"}"#);

        drop(coordinator.spawn_refresh_service("orders"));

        let result = tokio::time::timeout(Duration::from_secs(1), async {
            loop {
                if coordinator.cache().get("orders").await.unwrap().last_updated.is_some() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        assert!(result.is_ok(), "detached refresh never updated the cache");
        assert!(coordinator.cache().get_document("orders").await.is_ok());

        let unknown = coordinator.spawn_refresh_service("unknown").await.unwrap();
        assert!(matches!(unknown, Err(RefreshError::UnknownService(_))));
    }

    #[tokio::test]
    async fn test_refresh_unknown_service() {
        let (coordinator, fetcher) = setup(&["orders"]);

        let err = coordinator.refresh_service("unknown").await.unwrap_err();
        assert!(matches!(err, RefreshError::UnknownService(ref n) if n == "unknown"));
        assert_eq!(err.to_string(), "service unknown not found");
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_refresh_all_with_empty_registry() {
        let (coordinator, _) = setup(&[]);
        let report = coordinator.refresh_all().await;
        assert_eq!(report.total(), 0);
        assert!(report.is_success());
    }

    /// Fetcher whose document requests only complete once `n` are in flight
    struct BarrierFetcher {
        barrier: tokio::sync::Barrier,
    }

    #[async_trait]
    impl Fetcher for BarrierFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError> {
            if url.ends_with("/swagger.json") {
                self.barrier.wait().await;
            }
            Ok(FetchResponse {
                status: 200,
                body: br#"{"openapi":"3.1.0"}"#.to_vec(),
            })
        }
    }

    #[tokio::test]
    async fn test_refresh_all_runs_services_concurrently() {
        let names = ["a", "b", "c", "d", "e"];
        let registry = Arc::new(
            ServiceRegistry::new(
                names
                    .iter()
                    .map(|n| ServiceDescriptor::new(*n, format!("http://{n}")))
                    .collect(),
            )
            .unwrap(),
        );
        let cache = Arc::new(DocumentCache::new(&registry));
        let fetcher = Arc::new(BarrierFetcher {
            barrier: tokio::sync::Barrier::new(names.len()),
        });
        let coordinator = RefreshCoordinator::new(registry, cache.clone(), fetcher);

        let report = tokio::time::timeout(Duration::from_secs(5), coordinator.refresh_all())
            .await
            .expect("sequential refresh would never pass the barrier");

        assert_eq!(report.succeeded.len(), names.len());
        assert_eq!(cache.stats().await.with_document, names.len());
    }

    #[tokio::test]
    async fn test_trigger_refresh_all_is_detached() {
        let (coordinator, fetcher) = setup(&["orders"]);
        fetcher.route("http://orders/swagger.json", 200, r#"{"openapi":"3.0.0"}"#);

        let handle = coordinator.trigger_refresh_all();
        let report = handle.await.unwrap();

        assert!(report.is_success());
        assert!(coordinator.cache().get_document("orders").await.is_ok());
    }

    #[tokio::test]
    async fn test_schedule_repeats_until_cancelled() {
        let (coordinator, fetcher) = setup(&["orders"]);
        let cancel = CancellationToken::new();

        let handle = coordinator.spawn_schedule(Duration::from_millis(20), cancel.clone());
        tokio::time::sleep(Duration::from_millis(150)).await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();

        // Two fetches per cycle, at least two cycles
        let calls = fetcher.calls();
        assert!(calls >= 4, "expected repeated cycles, saw {calls} fetches");

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(fetcher.calls(), calls);
    }

    #[tokio::test]
    async fn test_from_config_builds_one_entry_per_service() {
        let mut config = Config::default();
        config.services = vec![
            ServiceDescriptor::new("orders", "http://orders"),
            ServiceDescriptor::new("users", "http://users"),
        ];

        let coordinator = RefreshCoordinator::from_config(&config).unwrap();
        assert_eq!(coordinator.registry().len(), 2);
        assert_eq!(coordinator.cache().names(), ["orders", "users"]);
    }

    #[test]
    fn test_cache_error_conversion() {
        let err: RefreshError = CacheError::NotFound("orders".to_string()).into();
        assert!(matches!(err, RefreshError::UnknownService(_)));

        let err: RefreshError = CacheError::NotReady("orders".to_string()).into();
        assert!(matches!(err, RefreshError::Cache(CacheError::NotReady(_))));
        assert_eq!(err.to_string(), "swagger doc not available for orders");
    }
}
