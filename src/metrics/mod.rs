//! Prometheus metrics for the documentation hub
//!
//! This module tracks:
//! - Refresh cycles: count, duration, per-service outcomes
//! - Backend state: health and document availability per service
//! - API: requests by endpoint and status
//!
//! # Usage
//!
//! Call `init_metrics()` at application startup to register all metrics.
//! If initialization fails, metrics operations become no-ops.

use prometheus::{
    register_counter, register_counter_vec, register_gauge_vec, register_histogram,
    Counter, CounterVec, Encoder, GaugeVec, Histogram, TextEncoder,
};
use std::sync::{Mutex, OnceLock};

// ============================================================================
// Metrics Storage
// ============================================================================

struct HubMetrics {
    refresh_cycles: Counter,
    refresh_cycle_failures: Counter,
    refresh_duration: Histogram,
    service_refreshes: CounterVec,
    service_healthy: GaugeVec,
    service_document: GaugeVec,
    api_requests: CounterVec,
}

static HUB_METRICS: OnceLock<HubMetrics> = OnceLock::new();

/// Serializes registration so concurrent callers never register twice
static METRICS_INIT_LOCK: Mutex<()> = Mutex::new(());

// ============================================================================
// Initialization
// ============================================================================

/// Register all metrics with the default Prometheus registry
///
/// Safe to call more than once; only the first call registers.
///
/// # Example
///
/// ```ignore
/// if let Err(e) = docs_hub::metrics::init_metrics() {
///     eprintln!("Warning: Metrics initialization failed: {}", e);
/// }
/// ```
pub fn init_metrics() -> Result<(), prometheus::Error> {
    let _guard = METRICS_INIT_LOCK
        .lock()
        .map_err(|e| prometheus::Error::Msg(e.to_string()))?;
    if HUB_METRICS.get().is_some() {
        return Ok(());
    }

    let metrics = HubMetrics {
        refresh_cycles: register_counter!(
            "docs_hub_refresh_cycles_total",
            "Total number of completed full refresh cycles"
        )?,
        refresh_cycle_failures: register_counter!(
            "docs_hub_refresh_service_failures_total",
            "Total number of failed service refreshes across all cycles"
        )?,
        refresh_duration: register_histogram!(
            "docs_hub_refresh_cycle_duration_seconds",
            "Duration of a full refresh cycle in seconds",
            vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0]
        )?,
        service_refreshes: register_counter_vec!(
            "docs_hub_service_refreshes_total",
            "Service refresh attempts by outcome",
            &["service", "outcome"]
        )?,
        service_healthy: register_gauge_vec!(
            "docs_hub_service_healthy",
            "Last observed health of each backend service (1 = healthy)",
            &["service"]
        )?,
        service_document: register_gauge_vec!(
            "docs_hub_service_document_cached",
            "Whether a document is cached for each backend service (1 = cached)",
            &["service"]
        )?,
        api_requests: register_counter_vec!(
            "docs_hub_api_requests_total",
            "Total API requests by endpoint and status",
            &["endpoint", "status"]
        )?,
    };

    HUB_METRICS.set(metrics).ok();
    tracing::debug!("Prometheus metrics registered");
    Ok(())
}

pub fn metrics_initialized() -> bool {
    HUB_METRICS.get().is_some()
}

/// Encode all registered metrics in the Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&prometheus::gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

// ============================================================================
// Recording
// ============================================================================

/// Record the end of a full refresh cycle
pub fn record_cycle(succeeded: usize, failed: usize) {
    if let Some(m) = HUB_METRICS.get() {
        m.refresh_cycles.inc();
        m.refresh_cycle_failures.inc_by(failed as f64);
        tracing::trace!(succeeded, failed, "Recorded refresh cycle");
    }
}

/// Record one service refresh; `outcome` is `success` or a fetch error kind
pub fn record_service_refresh(service: &str, healthy: bool, cached: bool, outcome: &str) {
    if let Some(m) = HUB_METRICS.get() {
        m.service_refreshes
            .with_label_values(&[service, outcome])
            .inc();
        m.service_healthy
            .with_label_values(&[service])
            .set(if healthy { 1.0 } else { 0.0 });
        m.service_document
            .with_label_values(&[service])
            .set(if cached { 1.0 } else { 0.0 });
    }
}

pub fn record_api_request(endpoint: &str, status: u16) {
    let Some(m) = HUB_METRICS.get() else {
        return;
    };

    let status = status.to_string();
    m.api_requests
        .with_label_values(&[endpoint, status.as_str()])
        .inc();
}

/// Observes elapsed time into the cycle histogram when dropped
pub struct MetricsTimer {
    timer: Option<prometheus::HistogramTimer>,
}

impl Drop for MetricsTimer {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.observe_duration();
        }
    }
}

/// Start timing a refresh cycle
pub fn start_cycle_timer() -> MetricsTimer {
    MetricsTimer {
        timer: HUB_METRICS.get().map(|m| m.refresh_duration.start_timer()),
    }
}

// ============================================================================
// Tests
// ============================================================================
