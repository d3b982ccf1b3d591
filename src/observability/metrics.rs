//! Metrics collection and exposition.
//!
//! # Metrics
//! - `sky_responses_total` (counter): responses written, by `status`
//! - `sky_connections_active` (gauge): connections currently open
//! - `sky_drift_bytes_total` (counter): payload bytes stored by Drift uploads
//! - `sky_drift_uploads_total` (counter): Drift uploads by `outcome`
//!
//! Until [`init_metrics`] installs the Prometheus recorder, every update is
//! a no-op.

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::protocol::Status;

pub const RESPONSES_TOTAL: &str = "sky_responses_total";
pub const CONNECTIONS_ACTIVE: &str = "sky_connections_active";
pub const DRIFT_BYTES_TOTAL: &str = "sky_drift_bytes_total";
pub const DRIFT_UPLOADS_TOTAL: &str = "sky_drift_uploads_total";

/// Start the Prometheus scrape endpoint on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), metrics_exporter_prometheus::BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_response(status: Status) {
    counter!(RESPONSES_TOTAL, "status" => status.code()).increment(1);
}

pub fn record_drift_bytes(bytes: usize) {
    counter!(DRIFT_BYTES_TOTAL).increment(bytes as u64);
}

/// `outcome` is one of `stored`, `unauthorized`, `too_large`, `failed`, `incomplete`.
pub fn record_drift_outcome(outcome: &'static str) {
    counter!(DRIFT_UPLOADS_TOTAL, "outcome" => outcome).increment(1);
}

pub fn connection_opened() {
    gauge!(CONNECTIONS_ACTIVE).increment(1.0);
}

pub fn connection_closed() {
    gauge!(CONNECTIONS_ACTIVE).decrement(1.0);
}
