//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define check metrics (decisions, latency, authority status codes)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `forwardeaz_checks_total` (counter): checks by api_version, decision
//! - `forwardeaz_check_duration_seconds` (histogram): check latency by api_version
//! - `forwardeaz_authority_responses_total` (counter): authority responses by status
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - `decision` is one of allow, deny, error

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter with an HTTP listener on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record the outcome of one check call.
///
/// `allowed` is `None` when the call failed without a decision.
pub fn record_check(api_version: &'static str, allowed: Option<bool>, started: Instant) {
    let decision = match allowed {
        Some(true) => "allow",
        Some(false) => "deny",
        None => "error",
    };
    counter!(
        "forwardeaz_checks_total",
        "api_version" => api_version,
        "decision" => decision
    )
    .increment(1);
    histogram!("forwardeaz_check_duration_seconds", "api_version" => api_version)
        .record(started.elapsed().as_secs_f64());
}

/// Record the status code returned by the forward-auth authority.
pub fn record_authority_status(status: u16) {
    counter!("forwardeaz_authority_responses_total", "status" => status.to_string()).increment(1);
}
