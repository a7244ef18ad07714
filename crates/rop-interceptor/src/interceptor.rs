//! The interceptor capability.
//!
//! An [`Interceptor`] is a unit of cross-cutting behavior around a service
//! call. Every method has a neutral default, so an implementation only
//! overrides what it needs:
//!
//! | Method | Default |
//! |---|---|
//! | [`is_match`](Interceptor::is_match) | matches every request |
//! | [`order`](Interceptor::order) | [`DEFAULT_ORDER`], runs last |
//! | [`before_service`](Interceptor::before_service) | no-op |
//! | [`before_response`](Interceptor::before_response) | no-op |
//!
//! # Example
//!
//! ```
//! use rop_core::{ErrorCategory, RequestContext, RopError, RopResult};
//! use rop_interceptor::{BoxFuture, Interceptor};
//!
//! struct DenyLegacyVersions;
//!
//! impl Interceptor for DenyLegacyVersions {
//!     fn name(&self) -> &'static str {
//!         "deny_legacy_versions"
//!     }
//!
//!     fn order(&self) -> i32 {
//!         10
//!     }
//!
//!     fn before_service<'a>(
//!         &'a self,
//!         ctx: &'a mut RequestContext,
//!     ) -> BoxFuture<'a, RopResult<()>> {
//!         Box::pin(async move {
//!             if ctx.version() == Some("0.9") {
//!                 return Err(RopError::abort(self.name(), ErrorCategory::Validation, "version retired"));
//!             }
//!             Ok(())
//!         })
//!     }
//! }
//! ```

use rop_core::{RequestContext, RopResult};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A boxed future returned by interceptor hooks.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Priority of an interceptor that does not choose one.
pub const DEFAULT_ORDER: i32 = i32::MAX;

/// Pre/post processing around a service call.
///
/// Interceptors are created once at startup and shared by every request,
/// so they must be `Send + Sync`. Per-request state belongs in the
/// [`RequestContext`] attribute bag, not in the interceptor.
///
/// # Invariants
///
/// - `is_match` and `order` are pure; the chain may call them at any time
/// - A `before_service` error aborts the request: the handler and every
///   `before_response` hook are skipped
/// - Hooks already run are not compensated after an abort
pub trait Interceptor: Send + Sync + 'static {
    /// Returns the name of this interceptor, used in logs and abort errors.
    fn name(&self) -> &'static str;

    /// Returns `true` if this interceptor applies to the request.
    fn is_match(&self, _ctx: &RequestContext) -> bool {
        true
    }

    /// Priority; lower values run first.
    fn order(&self) -> i32 {
        DEFAULT_ORDER
    }

    /// Runs before the service handler.
    fn before_service<'a>(&'a self, _ctx: &'a mut RequestContext) -> BoxFuture<'a, RopResult<()>> {
        Box::pin(async { Ok(()) })
    }

    /// Runs after the service handler produced a response.
    fn before_response<'a>(&'a self, _ctx: &'a mut RequestContext) -> BoxFuture<'a, RopResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

impl<I: Interceptor + ?Sized> Interceptor for Arc<I> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn is_match(&self, ctx: &RequestContext) -> bool {
        (**self).is_match(ctx)
    }

    fn order(&self) -> i32 {
        (**self).order()
    }

    fn before_service<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, RopResult<()>> {
        (**self).before_service(ctx)
    }

    fn before_response<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, RopResult<()>> {
        (**self).before_response(ctx)
    }
}

type Matcher = Box<dyn Fn(&RequestContext) -> bool + Send + Sync>;
type Hook = Box<dyn Fn(&mut RequestContext) -> RopResult<()> + Send + Sync>;

/// An interceptor assembled from closures.
///
/// Each piece that is not supplied keeps the [`Interceptor`] default.
///
/// # Example
///
/// ```
/// use rop_interceptor::FnInterceptor;
///
/// let tagger = FnInterceptor::new("tagger")
///     .with_order(5)
///     .matching(|ctx| ctx.method() == Some("user.get"))
///     .on_before_service(|ctx| {
///         ctx.set_attribute("tagged", true);
///         Ok(())
///     });
/// ```
pub struct FnInterceptor {
    name: &'static str,
    order: i32,
    matcher: Option<Matcher>,
    before_service: Option<Hook>,
    before_response: Option<Hook>,
}

impl FnInterceptor {
    /// Creates an interceptor that matches everything and does nothing.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            order: DEFAULT_ORDER,
            matcher: None,
            before_service: None,
            before_response: None,
        }
    }

    /// Sets the priority.
    #[must_use]
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Sets the match predicate.
    #[must_use]
    pub fn matching<F>(mut self, matcher: F) -> Self
    where
        F: Fn(&RequestContext) -> bool + Send + Sync + 'static,
    {
        self.matcher = Some(Box::new(matcher));
        self
    }

    /// Sets the pre-service hook.
    #[must_use]
    pub fn on_before_service<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut RequestContext) -> RopResult<()> + Send + Sync + 'static,
    {
        self.before_service = Some(Box::new(hook));
        self
    }

    /// Sets the post-service hook.
    #[must_use]
    pub fn on_before_response<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut RequestContext) -> RopResult<()> + Send + Sync + 'static,
    {
        self.before_response = Some(Box::new(hook));
        self
    }
}

impl std::fmt::Debug for FnInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnInterceptor")
            .field("name", &self.name)
            .field("order", &self.order)
            .field("matcher", &self.matcher.is_some())
            .field("before_service", &self.before_service.is_some())
            .field("before_response", &self.before_response.is_some())
            .finish()
    }
}

impl Interceptor for FnInterceptor {
    fn name(&self) -> &'static str {
        self.name
    }

    fn is_match(&self, ctx: &RequestContext) -> bool {
        self.matcher.as_ref().map_or(true, |matcher| matcher(ctx))
    }

    fn order(&self) -> i32 {
        self.order
    }

    fn before_service<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, RopResult<()>> {
        let result = self.before_service.as_ref().map_or(Ok(()), |hook| hook(ctx));
        Box::pin(async move { result })
    }

    fn before_response<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, RopResult<()>> {
        let result = self.before_response.as_ref().map_or(Ok(()), |hook| hook(ctx));
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rop_core::{ErrorCategory, ParameterSet, RopError};

    struct Neutral;

    impl Interceptor for Neutral {
        fn name(&self) -> &'static str {
            "neutral"
        }
    }

    fn ctx() -> RequestContext {
        RequestContext::new([("method", "user.get")].into_iter().collect::<ParameterSet>())
    }

    #[tokio::test]
    async fn test_defaults_are_neutral() {
        let mut ctx = ctx();
        let interceptor = Neutral;
        assert!(interceptor.is_match(&ctx));
        assert_eq!(interceptor.order(), i32::MAX);
        assert!(interceptor.before_service(&mut ctx).await.is_ok());
        assert!(interceptor.before_response(&mut ctx).await.is_ok());
        assert_eq!(ctx.attribute_count(), 0);
    }

    #[tokio::test]
    async fn test_fn_interceptor_hooks() {
        let interceptor = FnInterceptor::new("counter")
            .with_order(3)
            .on_before_service(|ctx| {
                ctx.set_attribute("count", 1_u32);
                Ok(())
            })
            .on_before_response(|ctx| {
                *ctx.attribute_mut::<u32>("count").unwrap() += 1;
                Ok(())
            });

        let mut ctx = ctx();
        assert_eq!(interceptor.order(), 3);
        interceptor.before_service(&mut ctx).await.unwrap();
        interceptor.before_response(&mut ctx).await.unwrap();
        assert_eq!(ctx.attribute::<u32>("count"), Some(&2));
    }

    #[tokio::test]
    async fn test_fn_interceptor_matcher_and_abort() {
        let interceptor = FnInterceptor::new("gate")
            .matching(|ctx| ctx.method() == Some("user.delete"))
            .on_before_service(|_| Err(RopError::abort("gate", ErrorCategory::Authorization, "no")));

        let mut ctx = ctx();
        assert!(!interceptor.is_match(&ctx));
        let error = interceptor.before_service(&mut ctx).await.unwrap_err();
        assert_eq!(error.category(), ErrorCategory::Authorization);
    }

    #[test]
    fn test_arc_delegates() {
        let shared = Arc::new(FnInterceptor::new("shared").with_order(-1));
        assert_eq!(Interceptor::order(&shared), -1);
        assert_eq!(Interceptor::name(&shared), "shared");
    }
}
