//! Prometheus metrics for the grabwire server.
//!
//! Provides observability through Prometheus-compatible metrics.
//! Metrics are exposed at `GET /metrics` in Prometheus text format.
//!
//! # Metrics Exposed
//!
//! ## Request Metrics
//! - `grabwire_http_requests_total` - Total HTTP requests (labels: method, path, status)
//! - `grabwire_http_request_duration_seconds` - Request duration histogram
//!
//! ## Store Metrics
//! - `grabwire_records_admitted_total` - Records accepted into the store
//! - `grabwire_records_rejected_total` - Records rejected by sanitization
//! - `grabwire_records_evicted_total` - Records evicted at capacity
//! - `grabwire_records_expired_total` - Records removed by TTL (lazy or sweep)
//! - `grabwire_store_records` - Current live record count
//!
//! ## Session Metrics
//! - `grabwire_sessions_active` - Currently connected sessions
//! - `grabwire_session_messages_total` - Inbound session messages (labels: kind)
//! - `grabwire_broadcasts_sent_total` - Broadcast notifications delivered

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

/// Global Prometheus handle for rendering metrics.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initializes the metrics system.
///
/// Safe to call more than once (integration tests spin up several servers in
/// one process); only the first call installs the recorder.
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .expect("Failed to install Prometheus recorder");
            register_metrics();
            handle
        })
        .clone()
}

/// Gets the global Prometheus handle.
pub fn get_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

/// Registers all metric descriptions.
fn register_metrics() {
    // HTTP metrics
    describe_counter!(
        "grabwire_http_requests_total",
        "Total number of HTTP requests"
    );
    describe_histogram!(
        "grabwire_http_request_duration_seconds",
        "HTTP request duration in seconds"
    );

    // Store metrics
    describe_counter!(
        "grabwire_records_admitted_total",
        "Records accepted into the store"
    );
    describe_counter!(
        "grabwire_records_rejected_total",
        "Records rejected by sanitization"
    );
    describe_counter!(
        "grabwire_records_evicted_total",
        "Records evicted to satisfy the capacity ceiling"
    );
    describe_counter!(
        "grabwire_records_expired_total",
        "Records removed after their TTL elapsed"
    );
    describe_gauge!("grabwire_store_records", "Current live record count");

    // Session metrics
    describe_gauge!("grabwire_sessions_active", "Currently connected sessions");
    describe_counter!(
        "grabwire_session_messages_total",
        "Inbound session messages by kind"
    );
    describe_counter!(
        "grabwire_broadcasts_sent_total",
        "Broadcast notifications delivered to sessions"
    );
}

// =============================================================================
// HTTP Metrics
// =============================================================================

/// Records an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    counter!(
        "grabwire_http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        "grabwire_http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_secs);
}

// =============================================================================
// Store Metrics
// =============================================================================

/// Records a successful admission.
pub fn record_admitted() {
    counter!("grabwire_records_admitted_total").increment(1);
}

/// Records a sanitization rejection.
pub fn record_rejected() {
    counter!("grabwire_records_rejected_total").increment(1);
}

/// Records a capacity eviction.
pub fn record_evicted() {
    counter!("grabwire_records_evicted_total").increment(1);
}

/// Records TTL removals (lazy reads and sweeps both land here).
pub fn record_expired(count: u64) {
    if count > 0 {
        counter!("grabwire_records_expired_total").increment(count);
    }
}

/// Sets the current live record count.
#[allow(clippy::cast_precision_loss)]
pub fn set_store_records(count: usize) {
    gauge!("grabwire_store_records").set(count as f64);
}

// =============================================================================
// Session Metrics
// =============================================================================

/// Sets the currently connected session count.
#[allow(clippy::cast_precision_loss)]
pub fn set_sessions_active(count: usize) {
    gauge!("grabwire_sessions_active").set(count as f64);
}

/// Records an inbound session message.
pub fn record_session_message(kind: &str) {
    counter!(
        "grabwire_session_messages_total",
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// Records broadcast notifications delivered to other sessions.
pub fn record_broadcast(delivered: u64) {
    if delivered > 0 {
        counter!("grabwire_broadcasts_sent_total").increment(delivered);
    }
}

// =============================================================================
// Metrics Rendering
// =============================================================================

/// Renders all metrics in Prometheus text format.
pub fn render_metrics() -> String {
    match get_handle() {
        Some(handle) => handle.render(),
        None => "# Metrics not initialized\n".to_string(),
    }
}
