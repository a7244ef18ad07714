//! App-level access control.
//!
//! Grants each app key a set of service methods it may call. A grant of
//! `"*"` allows every method. Requests from unknown apps, or for methods
//! outside the grant, are aborted before the service runs.
//!
//! # Example
//!
//! ```
//! use rop_interceptor::stages::AccessControlInterceptor;
//!
//! let access = AccessControlInterceptor::builder()
//!     .grant("00001", ["user.get", "user.list"])
//!     .grant("00002", ["*"])
//!     .build();
//! ```

use crate::interceptor::{BoxFuture, Interceptor};
use rop_core::{ErrorCategory, RequestContext, RopError, RopResult};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Priority of the access check; it runs before quota accounting.
pub const ACCESS_CONTROL_ORDER: i32 = 100;

const WILDCARD: &str = "*";

/// Outcome of an access decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// The call is allowed.
    Allow,
    /// The call is denied.
    Deny {
        /// The reason for denial.
        reason: String,
    },
}

/// Interceptor that checks app key → method grants.
#[derive(Debug, Clone, Default)]
pub struct AccessControlInterceptor {
    /// Maps app keys to allowed method names.
    grants: HashMap<String, HashSet<String>>,
    /// Whether apps without any grant may call every method.
    allow_unlisted: bool,
}

impl AccessControlInterceptor {
    /// Creates a builder with no grants.
    #[must_use]
    pub fn builder() -> AccessControlBuilder {
        AccessControlBuilder::default()
    }

    /// Decides whether `app_key` may call `method`.
    #[must_use]
    pub fn evaluate(&self, app_key: Option<&str>, method: Option<&str>) -> AccessDecision {
        let Some(app_key) = app_key else {
            return AccessDecision::Deny {
                reason: "missing app key".to_string(),
            };
        };
        let Some(method) = method else {
            return AccessDecision::Deny {
                reason: "missing service method".to_string(),
            };
        };

        match self.grants.get(app_key) {
            Some(methods) if methods.contains(WILDCARD) || methods.contains(method) => {
                AccessDecision::Allow
            }
            Some(_) => AccessDecision::Deny {
                reason: format!("app '{app_key}' may not call '{method}'"),
            },
            None if self.allow_unlisted => AccessDecision::Allow,
            None => AccessDecision::Deny {
                reason: format!("app '{app_key}' has no access grants"),
            },
        }
    }

    fn check(&self, ctx: &RequestContext) -> RopResult<()> {
        match self.evaluate(ctx.app_key(), ctx.method()) {
            AccessDecision::Allow => {
                debug!(
                    request_id = %ctx.request_id(),
                    app_key = ctx.app_key().unwrap_or_default(),
                    method = ctx.method().unwrap_or_default(),
                    "Access granted"
                );
                Ok(())
            }
            AccessDecision::Deny { reason } => {
                Err(RopError::abort(self.name(), ErrorCategory::Authorization, reason))
            }
        }
    }
}

impl Interceptor for AccessControlInterceptor {
    fn name(&self) -> &'static str {
        "access_control"
    }

    fn order(&self) -> i32 {
        ACCESS_CONTROL_ORDER
    }

    fn before_service<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, RopResult<()>> {
        let result = self.check(ctx);
        Box::pin(async move { result })
    }
}

/// Builder for [`AccessControlInterceptor`].
#[derive(Debug, Default)]
pub struct AccessControlBuilder {
    grants: HashMap<String, HashSet<String>>,
    allow_unlisted: bool,
}

impl AccessControlBuilder {
    /// Grants `app_key` the listed methods, adding to earlier grants.
    #[must_use]
    pub fn grant<I, S>(mut self, app_key: impl Into<String>, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.grants
            .entry(app_key.into())
            .or_default()
            .extend(methods.into_iter().map(Into::into));
        self
    }

    /// Lets apps without grants call every method.
    #[must_use]
    pub fn allow_unlisted(mut self, allow: bool) -> Self {
        self.allow_unlisted = allow;
        self
    }

    /// Builds the interceptor.
    #[must_use]
    pub fn build(self) -> AccessControlInterceptor {
        AccessControlInterceptor {
            grants: self.grants,
            allow_unlisted: self.allow_unlisted,
        }
    }
}
