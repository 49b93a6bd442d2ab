// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the swarm listener.
//!
//! All metrics share the namespace prefix `bindman_swarm_listener_`.
//!
//! # Metrics Categories
//!
//! - **Event Metrics** - Docker service events seen by the watcher
//! - **DNS Operation Metrics** - Calls the delegate made against the DNS manager
//! - **Sync Metrics** - Reconciliation passes, their duration, and loop exhaustion
//! - **Cache Metrics** - Number of records the listener believes it manages
//! - **Error Metrics** - Errors by component and category
//!
//! # Example
//!
//! ```rust,no_run
//! use bindman_swarm_listener::metrics::record_sync_pass;
//!
//! record_sync_pass("success", std::time::Duration::from_secs(1));
//! ```

use prometheus::{
    CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
};
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all listener metrics (prometheus-safe)
const METRICS_NAMESPACE: &str = "bindman_swarm_listener";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
///
/// All metrics are registered in this registry and exposed via `/metrics` endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Event Metrics
// ============================================================================

/// Total number of service events dispatched by the watcher
///
/// Labels:
/// - `action`: Docker action (`create`, `update`, `remove`)
pub static EVENTS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_events_total"),
        "Total number of service events dispatched by action",
    );
    let counter = CounterVec::new(opts, &["action"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// DNS Operation Metrics
// ============================================================================

/// Total number of delegate operations by action and outcome
///
/// Labels:
/// - `action`: `create`, `update`, `remove`
/// - `status`: `success`, `error`, `unchanged`, `rejected`
pub static DNS_OPERATIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_dns_operations_total"),
        "Total number of DNS manager operations by action and status",
    );
    let counter = CounterVec::new(opts, &["action", "status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Sync Metrics
// ============================================================================

/// Total number of reconciliation passes by outcome
///
/// Labels:
/// - `status`: `success`, `error`
pub static SYNC_PASSES_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_sync_passes_total"),
        "Total number of reconciliation passes by status",
    );
    let counter = CounterVec::new(opts, &["status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of reconciliation passes in seconds, lock wait included
pub static SYNC_PASS_DURATION_SECONDS: LazyLock<Histogram> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_sync_pass_duration_seconds"),
        "Duration of reconciliation passes in seconds",
    )
    .buckets(vec![0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]);
    let histogram = Histogram::with_opts(opts).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

/// Set to 1 once the sync loop has used all of its passes
pub static SYNC_EXHAUSTED: LazyLock<Gauge> = LazyLock::new(|| {
    let gauge = Gauge::new(
        format!("{METRICS_NAMESPACE}_sync_exhausted"),
        "Whether the reconciliation loop stopped after its last pass (1 = stopped)",
    )
    .unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

// ============================================================================
// Cache Metrics
// ============================================================================

/// Number of records held in the record cache
pub static CACHED_RECORDS: LazyLock<Gauge> = LazyLock::new(|| {
    let gauge = Gauge::new(
        format!("{METRICS_NAMESPACE}_cached_records"),
        "Number of service records the listener believes the DNS manager holds",
    )
    .unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

// ============================================================================
// Error Metrics
// ============================================================================

/// Total number of errors by component and error category
///
/// Labels:
/// - `component`: `watcher`, `sync`, `delegate`
/// - `error_type`: Category of error (`not_found`, `http_error`, `inspect_exhausted`, ...)
pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_errors_total"),
        "Total number of errors by component and error category",
    );
    let counter = CounterVec::new(opts, &["component", "error_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record a service event dispatched by the watcher
pub fn record_event(action: &str) {
    EVENTS_TOTAL.with_label_values(&[action]).inc();
}

/// Record the outcome of a delegate operation
///
/// # Arguments
/// * `action` - `create`, `update` or `remove`
/// * `status` - `success`, `error`, `unchanged` or `rejected`
pub fn record_dns_operation(action: &str, status: &str) {
    DNS_OPERATIONS_TOTAL
        .with_label_values(&[action, status])
        .inc();
}

/// Record a finished reconciliation pass
pub fn record_sync_pass(status: &str, duration: Duration) {
    SYNC_PASSES_TOTAL.with_label_values(&[status]).inc();
    SYNC_PASS_DURATION_SECONDS.observe(duration.as_secs_f64());
}

/// Flag the sync loop as stopped after its last pass
pub fn record_sync_exhausted() {
    SYNC_EXHAUSTED.set(1.0);
}

/// Publish the current size of the record cache
#[allow(clippy::cast_precision_loss)]
pub fn set_cached_records(count: usize) {
    CACHED_RECORDS.set(count as f64);
}

/// Record an error
///
/// # Arguments
/// * `component` - Where the error occurred (`watcher`, `sync`, `delegate`)
/// * `error_type` - Category of error
pub fn record_error(component: &str, error_type: &str) {
    ERRORS_TOTAL
        .with_label_values(&[component, error_type])
        .inc();
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}
