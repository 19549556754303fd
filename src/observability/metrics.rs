//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define dispatch tracing metrics
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `dispatch_traces_started_total` (counter): traces opened, by kind (new, continue) and sampled
//! - `dispatch_traces_not_sampled_total` (counter): requests carrying the do-not-sample token
//! - `dispatch_traces_filtered_total` (counter): requests skipped by the exclude filter
//! - `dispatch_traces_closed_total` (counter): traces closed
//! - `dispatch_trace_errors_total` (counter): recording failures, by phase
//! - `dispatch_active_traces` (gauge): sampled traces currently open
//!
//! # Design Decisions
//! - Recording functions are no-ops until a recorder is installed
//! - Labels are static strings only

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and serve it on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            describe();
            tracing::info!(address = %addr, "Metrics endpoint started");
        }
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

fn describe() {
    metrics::describe_counter!("dispatch_traces_started_total", "Traces opened by the dispatcher");
    metrics::describe_counter!("dispatch_traces_not_sampled_total", "Requests marked do-not-sample");
    metrics::describe_counter!("dispatch_traces_filtered_total", "Requests skipped by the exclude filter");
    metrics::describe_counter!("dispatch_traces_closed_total", "Traces closed");
    metrics::describe_counter!("dispatch_trace_errors_total", "Failures while recording a trace");
    metrics::describe_gauge!("dispatch_active_traces", "Sampled traces currently open");
}

pub fn record_trace_started(kind: &'static str, sampled: bool) {
    metrics::counter!(
        "dispatch_traces_started_total",
        "kind" => kind,
        "sampled" => if sampled { "true" } else { "false" }
    )
    .increment(1);
}

pub fn record_not_sampled() {
    metrics::counter!("dispatch_traces_not_sampled_total").increment(1);
}

pub fn record_filtered() {
    metrics::counter!("dispatch_traces_filtered_total").increment(1);
}

pub fn record_trace_closed() {
    metrics::counter!("dispatch_traces_closed_total").increment(1);
}

pub fn record_trace_error(phase: &'static str) {
    metrics::counter!("dispatch_trace_errors_total", "phase" => phase).increment(1);
}

pub fn set_active_traces(count: usize) {
    metrics::gauge!("dispatch_active_traces").set(count as f64);
}
