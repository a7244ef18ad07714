//! Gateway metrics.
//!
//! Recording goes through the `metrics` facade, so the functions here are
//! no-ops until a recorder is installed. [`init_metrics`] installs a
//! Prometheus recorder and returns a [`MetricsRegistry`] whose
//! [`render`](MetricsRegistry::render) output the host can serve however it
//! exposes its endpoints.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `rop_requests_total` | Counter | `method` | Served requests |
//! | `rop_request_duration_seconds` | Histogram | `method` | Request latency |
//! | `rop_rejections_total` | Counter | `code` | Requests rejected before or during the chain |
//! | `rop_quota_rejections_total` | Counter | `app_key` | Calls refused for exceeding quota |

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Served request counter.
pub const REQUESTS_TOTAL: &str = "rop_requests_total";
/// Request latency histogram.
pub const REQUEST_DURATION_SECONDS: &str = "rop_request_duration_seconds";
/// Rejected request counter.
pub const REJECTIONS_TOTAL: &str = "rop_rejections_total";
/// Quota rejection counter.
pub const QUOTA_REJECTIONS_TOTAL: &str = "rop_quota_rejections_total";

/// Metrics configuration.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Whether metrics are enabled.
    pub enabled: bool,

    /// Histogram buckets for request duration.
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            // 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
            duration_buckets: vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ],
        }
    }
}

/// Handle to the installed Prometheus recorder.
#[derive(Debug, Clone)]
pub struct MetricsRegistry {
    handle: PrometheusHandle,
}

impl MetricsRegistry {
    /// Wraps a Prometheus handle.
    #[must_use]
    pub fn new(handle: PrometheusHandle) -> Self {
        Self { handle }
    }

    /// Renders all metrics in Prometheus text format.
    #[must_use]
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Creates the Prometheus builder for `config`.
fn prometheus_builder(config: &MetricsConfig) -> TelemetryResult<PrometheusBuilder> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(REQUEST_DURATION_SECONDS.to_string()),
            &config.duration_buckets,
        )
        .map_err(|e| TelemetryError::InvalidConfig(e.to_string()))
}

/// Installs the global Prometheus recorder.
///
/// Returns `None` when metrics are disabled.
///
/// # Errors
///
/// Returns `TelemetryError::InvalidConfig` for empty buckets and
/// `TelemetryError::MetricsInit` if a recorder is already installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<Option<MetricsRegistry>> {
    if !config.enabled {
        return Ok(None);
    }

    let handle = prometheus_builder(config)?
        .install_recorder()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    describe_metrics();

    Ok(Some(MetricsRegistry::new(handle)))
}

/// Registers descriptions for all standard metrics.
pub fn describe_metrics() {
    describe_counter!(REQUESTS_TOTAL, "Total number of requests served");
    describe_histogram!(REQUEST_DURATION_SECONDS, "Request duration in seconds");
    describe_counter!(REJECTIONS_TOTAL, "Requests rejected by error code");
    describe_counter!(QUOTA_REJECTIONS_TOTAL, "Calls refused for exceeding the app quota");
}

/// Records a served request.
pub fn record_request(method: &str, duration: Duration) {
    counter!(REQUESTS_TOTAL, "method" => method.to_string()).increment(1);
    histogram!(REQUEST_DURATION_SECONDS, "method" => method.to_string())
        .record(duration.as_secs_f64());
}

/// Records a rejected request by machine error code.
pub fn record_rejection(error_code: &'static str) {
    counter!(REJECTIONS_TOTAL, "code" => error_code).increment(1);
}

/// Records a call refused by the quota.
pub fn record_quota_rejection(app_key: &str) {
    counter!(QUOTA_REJECTIONS_TOTAL, "app_key" => app_key.to_string()).increment(1);
}
