//! Metrics collection and exposition.
//!
//! # Metrics
//! - `kube_registration_api_requests_total` (counter): API server calls by method, outcome
//! - `kube_registration_notifications_total` (counter): label publications by label, outcome
//!
//! Without an installed recorder every update is a no-op, so library users
//! that never call [`init_metrics`] pay nothing.

use std::net::SocketAddr;
use std::sync::Once;

use metrics::{counter, describe_counter, Unit};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

pub const API_REQUESTS_TOTAL: &str = "kube_registration_api_requests_total";
pub const NOTIFICATIONS_TOTAL: &str = "kube_registration_notifications_total";

static REGISTER_METRICS: Once = Once::new();

/// Install the Prometheus exporter listening on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    register_metrics();
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

fn register_metrics() {
    REGISTER_METRICS.call_once(|| {
        describe_counter!(
            API_REQUESTS_TOTAL,
            Unit::Count,
            "Requests sent to the Kubernetes API server"
        );
        describe_counter!(
            NOTIFICATIONS_TOTAL,
            Unit::Count,
            "Pod label publications triggered by state changes"
        );
    });
}

pub fn record_api_request(method: &str, outcome: &'static str) {
    counter!(API_REQUESTS_TOTAL, "method" => method.to_string(), "outcome" => outcome).increment(1);
}

pub fn record_notification(label: &'static str, outcome: &'static str) {
    counter!(NOTIFICATIONS_TOTAL, "label" => label, "outcome" => outcome).increment(1);
}
