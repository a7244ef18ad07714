//! Observability for the Rop gateway.
//!
//! - **Logging**: Structured JSON or pretty logging via `tracing-subscriber`
//! - **Metrics**: Request, rejection and quota metrics via the `metrics` crate,
//!   rendered in Prometheus text format
//!
//! # Example
//!
//! ```rust,ignore
//! use rop_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let registry = init_telemetry(&TelemetryConfig::default())?;
//! if let Some(registry) = registry {
//!     println!("{}", registry.render());
//! }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;

pub use config::{TelemetryConfig, TelemetryConfigBuilder};
pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig};
pub use metrics::{init_metrics, MetricsConfig, MetricsRegistry};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Initializes logging and metrics.
///
/// Returns the metrics registry when metrics are enabled.
///
/// # Errors
///
/// Returns `TelemetryError` if either subsystem fails to initialize.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryResult<Option<MetricsRegistry>> {
    init_logging(&config.logging)?;
    init_metrics(&config.metrics)
}
