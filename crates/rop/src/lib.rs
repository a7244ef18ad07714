//! # Rop
//!
//! **Request signing and interception for an open-platform API gateway**
//!
//! Rop sits between a transport that has already decoded a request into
//! name/value parameters and the business service that answers it:
//!
//! - **Signing**: callers sign their parameters with a per-app secret;
//!   the gateway recomputes and compares in constant time
//! - **Interceptors**: an ordered chain of pre- and post-service hooks,
//!   with built-in access control, quota and audit stages
//! - **Configuration**: layered TOML/JSON, `.env` and environment overrides
//! - **Telemetry**: structured `tracing` logs and Prometheus metrics
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rop::prelude::*;
//!
//! let config = ConfigLoader::new().with_file("rop.toml")?.load()?;
//! let metrics = rop::init(&config)?;
//! let gateway = Gateway::from_config(&config)?;
//!
//! let reply = gateway
//!     .handle(params, |ctx| {
//!         let method = ctx.method().unwrap_or_default().to_string();
//!         Box::pin(async move { service.call(&method).await })
//!     })
//!     .await?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! params → RequestContext → signature check → before_service hooks → handler
//!                                                                      ↓
//!                                             reply ← before_response hooks
//! ```

#![doc(html_root_url = "https://docs.rs/rop/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod gateway;
pub mod secret;

pub use gateway::{Gateway, GatewayBuilder, LOCALE_KEY};
pub use secret::{SecretStore, StaticSecretStore};

pub use rop_config as config;
pub use rop_core as core;
pub use rop_interceptor as interceptor;
pub use rop_telemetry as telemetry;

pub use rop_config::{ConfigError, ConfigLoader, GatewayConfig};
pub use rop_core::{
    sign, verify, IgnoredNames, ParameterSet, RequestContext, RopError, RopResult, Secret,
    Signature,
};
pub use rop_interceptor::{BoxFuture, FnInterceptor, Interceptor, InterceptorChain};

use rop_config::LogFormat;
use rop_telemetry::{LogConfig, MetricsConfig, MetricsRegistry, TelemetryConfig, TelemetryError};

/// Initializes logging and metrics from the gateway configuration.
///
/// Call once at startup. Returns the metrics registry whose
/// [`render`](MetricsRegistry::render) output the host exposes.
///
/// # Errors
///
/// Returns [`TelemetryError`] if the log filter is invalid or a global
/// subscriber or recorder is already installed.
pub fn init(config: &GatewayConfig) -> Result<Option<MetricsRegistry>, TelemetryError> {
    rop_telemetry::init_telemetry(&telemetry_config(config))
}

fn telemetry_config(config: &GatewayConfig) -> TelemetryConfig {
    let logging = &config.logging;
    TelemetryConfig::builder()
        .logging(LogConfig {
            enabled: logging.enabled,
            level: logging.level.clone(),
            json_format: logging.format == LogFormat::Json,
            ansi: logging.ansi_enabled,
            span_events: false,
            file_line_info: logging.include_location,
            include_target: true,
        })
        .metrics(MetricsConfig::default())
        .build()
}

/// Prelude module for convenient imports.
///
/// ```
/// use rop::prelude::*;
/// ```
pub mod prelude {
    pub use crate::gateway::{Gateway, GatewayBuilder};
    pub use crate::secret::{SecretStore, StaticSecretStore};

    pub use rop_config::{ConfigLoader, GatewayConfig};
    pub use rop_core::{
        ErrorCategory, IgnoredNames, ParameterSet, RequestContext, RopError, RopResult, Secret,
        Signature, Signer,
    };
    pub use rop_interceptor::stages::{AccessControlInterceptor, AuditInterceptor, QuotaInterceptor};
    pub use rop_interceptor::{BoxFuture, FnInterceptor, Interceptor, InterceptorChain};
}

#[cfg(test)]
mod tests {
    use super::*;
    use rop_config::LoggingConfig;

    #[test]
    fn test_telemetry_config_from_gateway_config() {
        let config = GatewayConfig::builder()
            .logging(LoggingConfig {
                level: "debug".to_string(),
                format: LogFormat::Pretty,
                ..Default::default()
            })
            .build();

        let telemetry = telemetry_config(&config);
        assert_eq!(telemetry.logging.level, "debug");
        assert!(!telemetry.logging.json_format);
        assert!(telemetry.metrics.enabled);
    }

    #[test]
    fn test_production_config_logs_json() {
        let telemetry = telemetry_config(&GatewayConfig::production());
        assert!(telemetry.logging.json_format);
    }
}
