//! Prometheus metrics for the dispatch pipeline.
//!
//! Outcomes are labeled by failing stage so an unknown type tag (caller
//! input) is distinguishable from a missing template asset (deployment
//! fault) without reading logs.

use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec,
    TextEncoder,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "pictoria";

lazy_static! {
    /// Dispatch outcomes by stage:
    /// delivered | unknown_type | template_missing | persistence | delivery
    pub static ref DISPATCH_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_dispatch_total", METRIC_PREFIX),
        "Dispatch outcomes by pipeline stage",
        &["outcome"]
    ).unwrap();

    /// Stored (non-email) notifications accepted over the HTTP surface
    pub static ref NOTIFICATIONS_STORED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_notifications_stored_total", METRIC_PREFIX),
        "Stored notifications accepted"
    ).unwrap();

    /// Notifications marked read over the HTTP surface
    pub static ref NOTIFICATIONS_READ_TOTAL: IntCounter = register_int_counter!(
        format!("{}_notifications_read_total", METRIC_PREFIX),
        "Notifications marked as read"
    ).unwrap();

    /// gRPC SendNotification calls by result (ok | error)
    pub static ref GRPC_SEND_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_grpc_send_total", METRIC_PREFIX),
        "gRPC SendNotification calls by result",
        &["result"]
    ).unwrap();
}

/// Encode all registered metrics in the Prometheus text format.
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
