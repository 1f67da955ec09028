//! Metrics collection and exposition.
//!
//! # Metrics
//! - `ft_admin_requests_total` (counter): requests by operation, status
//! - `ft_admin_request_duration_seconds` (histogram): end-to-end latency
//! - `ft_admin_tx_outcomes_total` (counter): pipeline results by operation, outcome
//! - `ft_admin_tx_duration_seconds` (histogram): submit-to-settle latency
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

use crate::chain::types::{ChainResult, TransactionOutcome};

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one handled HTTP request.
pub fn record_request(operation: &str, status: u16, start: Instant) {
    let status = status.to_string();
    counter!(
        "ft_admin_requests_total",
        "operation" => operation.to_string(),
        "status" => status
    )
    .increment(1);
    histogram!(
        "ft_admin_request_duration_seconds",
        "operation" => operation.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record the result of one orchestrated transaction.
pub fn record_transaction(operation: &str, result: &ChainResult<TransactionOutcome>, start: Instant) {
    let outcome = match result {
        Ok(outcome) => outcome.status.as_str(),
        Err(e) => e.kind(),
    };
    counter!(
        "ft_admin_tx_outcomes_total",
        "operation" => operation.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!(
        "ft_admin_tx_duration_seconds",
        "operation" => operation.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}
