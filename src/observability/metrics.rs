//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gatekeeper_decisions_total` (counter): decisions by outcome and reason
//! - `gatekeeper_check_faults_total` (counter): checks that could not reach a verdict
//! - `gatekeeper_rate_windows` (gauge): live rate-limit windows
//! - `gatekeeper_upstream_requests_total` (counter): forwarded requests by status
//! - `gatekeeper_upstream_duration_seconds` (histogram): upstream latency
//!
//! Recording is a no-op until a recorder is installed, so library users and
//! tests pay nothing.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

pub const DECISIONS_TOTAL: &str = "gatekeeper_decisions_total";
pub const CHECK_FAULTS_TOTAL: &str = "gatekeeper_check_faults_total";
pub const RATE_WINDOWS: &str = "gatekeeper_rate_windows";
pub const UPSTREAM_REQUESTS_TOTAL: &str = "gatekeeper_upstream_requests_total";
pub const UPSTREAM_DURATION_SECONDS: &str = "gatekeeper_upstream_duration_seconds";

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    let builder = PrometheusBuilder::new().with_http_listener(addr);

    match builder.install() {
        Ok(()) => {
            describe_counter!(DECISIONS_TOTAL, "Security decisions by outcome and reason");
            describe_counter!(CHECK_FAULTS_TOTAL, "Security checks that faulted");
            describe_gauge!(RATE_WINDOWS, "Rate-limit windows currently tracked");
            describe_counter!(UPSTREAM_REQUESTS_TOTAL, "Requests forwarded upstream by status");
            describe_histogram!(UPSTREAM_DURATION_SECONDS, "Upstream request latency");
            tracing::info!(address = %addr, "Metrics exporter listening");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Prometheus recorder");
        }
    }
}

pub fn record_decision(outcome: &'static str, reason: &'static str) {
    counter!(DECISIONS_TOTAL, "outcome" => outcome, "reason" => reason).increment(1);
}

pub fn record_check_fault(check: &'static str) {
    counter!(CHECK_FAULTS_TOTAL, "check" => check).increment(1);
}

pub fn record_rate_windows(count: usize) {
    gauge!(RATE_WINDOWS).set(count as f64);
}

pub fn record_upstream(status: u16, start: Instant) {
    counter!(UPSTREAM_REQUESTS_TOTAL, "status" => status.to_string()).increment(1);
    histogram!(UPSTREAM_DURATION_SECONDS).record(start.elapsed().as_secs_f64());
}
