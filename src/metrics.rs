//! Prometheus metrics for discovery and download runs
//!
//! Instrumented code calls the `metrics` macros unconditionally; nothing is
//! recorded until [`init_metrics`] installs the Prometheus exporter, which
//! the CLI only does when `--metrics-addr` is given.
//!
//! ## Metrics
//!
//! - `http_requests_total`, `http_retries_total`, `fetch_unavailable_total`
//! - `listing_pages_total`
//! - `downloads_completed_total`, `downloads_skipped_total`, `downloads_failed_total`
//! - `http_request_duration_seconds`, `retry_backoff_duration_seconds`
//! - `admission_gate_peak_in_flight{gate}`

use metrics::{describe_counter, describe_gauge, describe_histogram, gauge, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::Lazy;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::gate::AdmissionGate;

/// Global metrics registry initialization flag
static METRICS_INITIALIZED: Lazy<Arc<RwLock<bool>>> = Lazy::new(|| Arc::new(RwLock::new(false)));

/// Install the Prometheus exporter on `addr` and describe every metric
///
/// Idempotent: later calls are no-ops.
pub async fn init_metrics(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    let mut initialized = METRICS_INITIALIZED.write().await;
    if *initialized {
        debug!("Metrics already initialized, skipping");
        return Ok(());
    }

    info!("Initializing metrics system on {}", addr);

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        "http_requests_total",
        Unit::Count,
        "Total number of HTTP GET attempts"
    );
    describe_counter!(
        "http_retries_total",
        Unit::Count,
        "Total number of retry attempts"
    );
    describe_counter!(
        "fetch_unavailable_total",
        Unit::Count,
        "URLs that exhausted their retry budget"
    );
    describe_counter!(
        "listing_pages_total",
        Unit::Count,
        "Bucket listing pages parsed"
    );
    describe_histogram!(
        "http_request_duration_seconds",
        Unit::Seconds,
        "HTTP request duration in seconds"
    );
    describe_histogram!(
        "retry_backoff_duration_seconds",
        Unit::Seconds,
        "Duration of retry backoff in seconds"
    );
    describe_counter!(
        "downloads_completed_total",
        Unit::Count,
        "Artifacts fetched and persisted"
    );
    describe_counter!(
        "downloads_skipped_total",
        Unit::Count,
        "Manifest entries already present on disk"
    );
    describe_counter!(
        "downloads_failed_total",
        Unit::Count,
        "Manifest entries that could not be completed"
    );
    describe_gauge!(
        "admission_gate_peak_in_flight",
        Unit::Count,
        "Highest number of simultaneous operations admitted by a gate"
    );

    *initialized = true;
    info!("Metrics system initialized successfully on {}", addr);
    Ok(())
}

/// Publish a gate's peak occupancy under `name`
pub fn record_gate_peak(name: &'static str, gate: &AdmissionGate) {
    gauge!("admission_gate_peak_in_flight", "gate" => name).set(gate.peak() as f64);
}

/// Whether [`init_metrics`] has completed
pub async fn is_initialized() -> bool {
    *METRICS_INITIALIZED.read().await
}
