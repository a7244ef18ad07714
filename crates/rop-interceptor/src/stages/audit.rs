//! Audit logging interceptor.
//!
//! Starts a timer in `before_service`, stashes it in the request's
//! attribute bag, and consumes it in `before_response` to emit one
//! structured log line and request metrics per successful call.
//!
//! # Metrics Emitted
//!
//! - `rop_requests_total` - Counter of served requests by method
//! - `rop_request_duration_seconds` - Histogram of end-to-end latency
//!
//! # Log Format
//!
//! - `request_id` - Unique request identifier
//! - `app_key` - Calling application
//! - `method` / `version` - Service method called
//! - `duration_ms` - Time since `before_service`
//! - `service_ms` - Time inside the handler

use crate::interceptor::{BoxFuture, Interceptor};
use rop_core::{RequestContext, RopResult};
use rop_telemetry::metrics;
use std::time::{Duration, Instant};
use tracing::info;

/// Attribute key of the timer started in `before_service`.
pub const AUDIT_TIMER_KEY: &str = "rop.audit.timer";

/// Attribute key of the record left behind by `before_response`.
pub const AUDIT_RECORD_KEY: &str = "rop.audit.record";

/// Start time of an audited request.
#[derive(Debug, Clone, Copy)]
pub struct AuditTimer {
    started_at: Instant,
}

/// What the audit interceptor recorded for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecord {
    /// The request ID.
    pub request_id: String,
    /// The calling app, or empty.
    pub app_key: String,
    /// The service method, or empty.
    pub method: String,
    /// The service version, or empty.
    pub version: String,
    /// Time from `before_service` to `before_response`.
    pub duration: Duration,
    /// Time spent in the handler.
    pub service_duration: Option<Duration>,
}

/// Interceptor that writes an audit trail for served requests.
///
/// Uses the default order, so it runs after every interceptor with an
/// explicit priority.
#[derive(Debug, Clone)]
pub struct AuditInterceptor {
    /// Service name for log fields.
    service_name: String,
}

impl AuditInterceptor {
    /// Creates an audit interceptor for `service_name`.
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    fn record(&self, ctx: &mut RequestContext) {
        let Some(timer) = ctx.remove_attribute::<AuditTimer>(AUDIT_TIMER_KEY) else {
            return;
        };

        let record = AuditRecord {
            request_id: ctx.request_id().to_string(),
            app_key: ctx.app_key().unwrap_or_default().to_string(),
            method: ctx.method().unwrap_or_default().to_string(),
            version: ctx.version().unwrap_or_default().to_string(),
            duration: timer.started_at.elapsed(),
            service_duration: ctx.service_duration(),
        };

        info!(
            service = %self.service_name,
            request_id = %record.request_id,
            app_key = %record.app_key,
            method = %record.method,
            version = %record.version,
            duration_ms = record.duration.as_secs_f64() * 1000.0,
            service_ms = record.service_duration.map(|d| d.as_secs_f64() * 1000.0),
            "Request served"
        );

        metrics::record_request(&record.method, record.duration);

        ctx.set_attribute(AUDIT_RECORD_KEY, record);
    }
}

impl Default for AuditInterceptor {
    fn default() -> Self {
        Self::new("rop")
    }
}

impl Interceptor for AuditInterceptor {
    fn name(&self) -> &'static str {
        "audit"
    }

    fn before_service<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, RopResult<()>> {
        ctx.set_attribute(
            AUDIT_TIMER_KEY,
            AuditTimer {
                started_at: Instant::now(),
            },
        );
        Box::pin(async { Ok(()) })
    }

    fn before_response<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, RopResult<()>> {
        self.record(ctx);
        Box::pin(async { Ok(()) })
    }
}
