//! Per-app request quota.
//!
//! Limits how many calls an app key may make per time window. The count
//! uses a sliding window: the previous window's count is weighted by how
//! much of it still overlaps the current one, which smooths the burst a
//! fixed window allows at each boundary.
//!
//! Requests over quota are aborted with a `RateLimited` error. Calls that
//! carry no app key share a single `anonymous` bucket.
//!
//! App keys come from the client, so buckets idle for two full windows are
//! swept, at most once per window.
//!
//! # Example
//!
//! ```
//! use rop_interceptor::stages::QuotaInterceptor;
//! use std::time::Duration;
//!
//! let quota = QuotaInterceptor::builder()
//!     .limit(100)
//!     .window(Duration::from_secs(60))
//!     .build();
//! ```

use crate::interceptor::{BoxFuture, Interceptor};
use parking_lot::Mutex;
use rop_core::{ErrorCategory, RequestContext, RopError, RopResult};
use rop_telemetry::metrics;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

/// Priority of quota accounting; it runs after access control so denied
/// calls do not consume quota.
pub const QUOTA_ORDER: i32 = 200;

/// Attribute key of the [`QuotaStatus`] left for later interceptors.
pub const QUOTA_STATUS_KEY: &str = "rop.quota.status";

const ANONYMOUS_BUCKET: &str = "anonymous";

/// Quota state of the current request's app after it was counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaStatus {
    /// Maximum calls allowed per window.
    pub limit: u64,
    /// Calls left in the current window.
    pub remaining: u64,
    /// Time until the current window resets.
    pub reset_after: Duration,
}

/// Interceptor enforcing a per-app call quota.
#[derive(Debug, Clone)]
pub struct QuotaInterceptor {
    limit: u64,
    window: Duration,
    store: Arc<Mutex<QuotaStore>>,
}

#[derive(Debug)]
struct QuotaStore {
    buckets: HashMap<String, WindowData>,
    last_sweep: Instant,
}

impl QuotaStore {
    fn new(now: Instant) -> Self {
        Self {
            buckets: HashMap::new(),
            last_sweep: now,
        }
    }

    /// Drops buckets whose counts would both reset on their next call.
    fn sweep(&mut self, now: Instant, window: Duration) {
        if now.duration_since(self.last_sweep) < window {
            return;
        }
        let idle_after = window.saturating_mul(2);
        self.buckets
            .retain(|_, data| now.duration_since(data.window_start) < idle_after);
        self.last_sweep = now;
    }
}

/// Data for a single quota window.
#[derive(Debug, Clone)]
struct WindowData {
    /// Number of calls in the current window.
    count: u64,
    /// When the current window started.
    window_start: Instant,
    /// Number of calls in the previous window.
    prev_count: u64,
}

/// Result of counting one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuotaCheck {
    Allowed(QuotaStatus),
    Exceeded(QuotaStatus),
}

impl QuotaInterceptor {
    /// Creates a builder (default: 100 calls per 60 seconds).
    #[must_use]
    pub fn builder() -> QuotaBuilder {
        QuotaBuilder::default()
    }

    /// Maximum calls per window.
    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.limit
    }

    /// Window length.
    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    fn count(&self, key: &str, now: Instant) -> QuotaCheck {
        let mut store = self.store.lock();
        let window = self.window;
        let limit = self.limit;

        store.sweep(now, window);
        let data = store.buckets.entry(key.to_string()).or_insert_with(|| WindowData {
            count: 0,
            window_start: now,
            prev_count: 0,
        });

        let elapsed = now.duration_since(data.window_start);
        if elapsed >= window {
            let windows_passed = elapsed.as_nanos() / window.as_nanos().max(1);
            data.prev_count = if windows_passed >= 2 { 0 } else { data.count };
            data.count = 0;
            data.window_start = now;
        }

        let progress =
            now.duration_since(data.window_start).as_secs_f64() / window.as_secs_f64().max(f64::EPSILON);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
        let weighted = data.count + (data.prev_count as f64 * (1.0 - progress)) as u64;
        let reset_after = window.saturating_sub(now.duration_since(data.window_start));

        if weighted >= limit {
            return QuotaCheck::Exceeded(QuotaStatus {
                limit,
                remaining: 0,
                reset_after,
            });
        }

        data.count += 1;
        QuotaCheck::Allowed(QuotaStatus {
            limit,
            remaining: limit.saturating_sub(weighted + 1),
            reset_after,
        })
    }

    fn check(&self, ctx: &mut RequestContext) -> RopResult<()> {
        let key = ctx.app_key().unwrap_or(ANONYMOUS_BUCKET).to_string();
        match self.count(&key, Instant::now()) {
            QuotaCheck::Allowed(status) => {
                ctx.set_attribute(QUOTA_STATUS_KEY, status);
                Ok(())
            }
            QuotaCheck::Exceeded(status) => {
                warn!(
                    request_id = %ctx.request_id(),
                    app_key = %key,
                    limit = status.limit,
                    retry_after_secs = status.reset_after.as_secs(),
                    "Quota exceeded"
                );
                metrics::record_quota_rejection(&key);
                Err(RopError::abort(
                    self.name(),
                    ErrorCategory::RateLimited,
                    format!(
                        "app '{key}' exceeded {} calls per {}s, retry after {}s",
                        status.limit,
                        self.window.as_secs(),
                        status.reset_after.as_secs().max(1)
                    ),
                ))
            }
        }
    }
}

impl Interceptor for QuotaInterceptor {
    fn name(&self) -> &'static str {
        "quota"
    }

    fn order(&self) -> i32 {
        QUOTA_ORDER
    }

    fn before_service<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, RopResult<()>> {
        let result = self.check(ctx);
        Box::pin(async move { result })
    }
}

/// Builder for [`QuotaInterceptor`].
#[derive(Debug, Clone)]
pub struct QuotaBuilder {
    limit: u64,
    window: Duration,
}

impl Default for QuotaBuilder {
    fn default() -> Self {
        Self {
            limit: 100,
            window: Duration::from_secs(60),
        }
    }
}

impl QuotaBuilder {
    /// Sets the maximum calls per window.
    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    /// Sets the window length.
    #[must_use]
    pub fn window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Sets the window length in seconds.
    #[must_use]
    pub fn window_secs(self, seconds: u64) -> Self {
        self.window(Duration::from_secs(seconds))
    }

    /// Builds the interceptor.
    #[must_use]
    pub fn build(self) -> QuotaInterceptor {
        QuotaInterceptor {
            limit: self.limit,
            window: self.window,
            store: Arc::new(Mutex::new(QuotaStore::new(Instant::now()))),
        }
    }
}
