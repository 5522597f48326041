//! Prometheus metrics for campus-server.
//!
//! Exposes server metrics in Prometheus format at the `/metrics` endpoint.

use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Initialize the Prometheus metrics recorder and return a handle for rendering.
///
/// Must be called once at server startup before any metrics are recorded.
pub fn init_metrics() -> PrometheusHandle {
    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    describe_counter!(
        "campus_membership_transitions_total",
        "Group membership transitions applied, labelled by operation"
    );
    describe_counter!(
        "campus_groups_created_total",
        "Groups created since server start"
    );

    handle
}

/// Record an applied membership transition (join, approve, leave, ...).
pub fn record_membership_transition(op: &'static str) {
    counter!("campus_membership_transitions_total", "op" => op).increment(1);
}

/// Record a created group.
pub fn record_group_created() {
    counter!("campus_groups_created_total").increment(1);
}
