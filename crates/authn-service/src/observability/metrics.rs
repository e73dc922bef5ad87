//! Metrics definitions for the authentication service
//!
//! All metrics follow Prometheus naming conventions:
//! - `authn_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `operation`: the five service operations
//! - `status`: `success` or an error kind (4 values)
//! - `action`: create, update, delete
//! - `outcome`: queued, exported, dropped_full, dropped_closed
//! - `query`: fixed PostgreSQL store query names

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the global Prometheus recorder and return the handle served at
/// `/metrics`.
///
/// # Errors
///
/// Returns error if a recorder is already installed.
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("authn_operation".to_string()),
            &[
                0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500,
            ],
        )
        .map_err(|e| format!("Failed to set operation buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("authn_store_query".to_string()),
            &[
                0.001, 0.002, 0.005, 0.010, 0.020, 0.050, 0.100, 0.250, 0.500, 1.000,
            ],
        )
        .map_err(|e| format!("Failed to set store query buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

/// Record a service operation's duration and outcome
///
/// Metric: `authn_operation_duration_seconds`, `authn_operations_total`
/// Labels: `operation`, `status`
pub fn record_operation(operation: &'static str, status: &'static str, duration: Duration) {
    histogram!("authn_operation_duration_seconds", "operation" => operation)
        .record(duration.as_secs_f64());

    counter!("authn_operations_total", "operation" => operation, "status" => status).increment(1);
}

/// Record an audit event transition
///
/// Metric: `authn_audit_events_total`
/// Labels: `action`, `outcome`
pub fn record_audit_event(action: &'static str, outcome: &'static str) {
    counter!("authn_audit_events_total", "action" => action, "outcome" => outcome).increment(1);
}

/// Record a PostgreSQL store query
///
/// Metric: `authn_store_query_duration_seconds`, `authn_store_queries_total`
/// Labels: `query`, `status`
pub fn record_store_query(query: &'static str, status: &'static str, duration: Duration) {
    histogram!("authn_store_query_duration_seconds", "query" => query)
        .record(duration.as_secs_f64());

    counter!("authn_store_queries_total", "query" => query, "status" => status).increment(1);
}

/// Record authentications removed by the expiry cleanup task
///
/// Metric: `authn_cleanup_deleted_total`
pub fn record_cleanup_deleted(count: u64) {
    counter!("authn_cleanup_deleted_total").increment(count);
}
