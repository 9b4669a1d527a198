//! Prometheus exposition.
//!
//! Subsystem crates register their counters in the default registry when
//! built with their `metrics` feature; this module renders whatever is
//! registered.

use crate::TelemetryError;
use lazy_static::lazy_static;
use prometheus::{register_int_gauge_vec, Encoder, IntGaugeVec, TextEncoder};

lazy_static! {
    /// Constant `1`, labeled with service and version
    pub static ref BUILD_INFO: IntGaugeVec = register_int_gauge_vec!(
        "ledger_sync_build_info",
        "Build information",
        &["service", "version"]
    )
    .expect("Failed to create BUILD_INFO metric");
}

/// Publish the build info gauge.
pub fn record_build_info(service_name: &str) {
    BUILD_INFO
        .with_label_values(&[service_name, env!("CARGO_PKG_VERSION")])
        .set(1);
}

/// Render the default registry in the text exposition format.
pub fn gather_metrics() -> Result<String, TelemetryError> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
