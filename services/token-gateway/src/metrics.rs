//! Prometheus metrics exposition
//!
//! - `gateway_login_attempts_total` (counter): label `outcome`
//! - `gateway_gate_decisions_total` (counter): label `decision`
//! - `gateway_pool_operations_total` (counter): labels `operation`, `outcome`

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return a handle for rendering metrics.
///
/// The handle's `render()` method produces the Prometheus text exposition format
/// served on `/metrics`.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Record one login attempt: `success`, `unauthorized`, `bad_request` or `error`.
pub fn record_login(outcome: &'static str) {
    metrics::counter!("gateway_login_attempts_total", "outcome" => outcome).increment(1);
}

/// Record one gate decision: `allow` or `deny`.
pub fn record_gate_decision(decision: &'static str) {
    metrics::counter!("gateway_gate_decisions_total", "decision" => decision).increment(1);
}

/// Record one admin pool operation and how it ended.
pub fn record_pool_operation(operation: &'static str, outcome: &'static str) {
    metrics::counter!(
        "gateway_pool_operations_total",
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
}
