//! Prometheus metrics for delivery traffic.
//!
//! Without an installed recorder these calls are no-ops, so library users and
//! tests pay nothing.

use ::metrics::counter;

/// Record a finished full-file transfer.
pub fn record_transfer(kind: &'static str, status: &'static str) {
    counter!("depot_transfers_total", "kind" => kind, "status" => status).increment(1);
}

/// Record a ranged (seek) request. These never produce a transfer record.
pub fn record_range_request(kind: &'static str) {
    counter!("depot_range_requests_total", "kind" => kind).increment(1);
}

/// Record body bytes handed to clients.
pub fn record_bytes_sent(kind: &'static str, bytes: u64) {
    counter!("depot_bytes_sent_total", "kind" => kind).increment(bytes);
}

/// Record a request refused before streaming.
pub fn record_rejected(reason: &'static str) {
    counter!("depot_rejected_requests_total", "reason" => reason).increment(1);
}

/// Install the Prometheus recorder and return a handle that renders it.
///
/// # Errors
///
/// Returns an error if a global recorder is already installed.
#[cfg(feature = "prometheus")]
pub fn install_prometheus() -> anyhow::Result<metrics_exporter_prometheus::PrometheusHandle> {
    use anyhow::Context;

    metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")
}
