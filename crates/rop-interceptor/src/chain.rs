//! Ordered interceptor chain.
//!
//! The chain is assembled once at startup with an [`InterceptorChainBuilder`]
//! and is immutable afterwards. Request-time dispatch only reads it, so one
//! [`InterceptorChain`] behind an `Arc` serves every concurrent request.
//!
//! ## Dispatch
//!
//! ```text
//! is_match? ──► before_service (ascending order) ──► handler
//!                                                      │
//! response ◄── before_response (ascending order) ◄─────┘
//! ```
//!
//! Ordering is by [`Interceptor::order`] ascending; interceptors with equal
//! order keep their registration sequence. The post-hooks reuse the same
//! order as the pre-hooks.

use crate::interceptor::{BoxFuture, Interceptor};
use rop_core::{RequestContext, RopResult};
use std::sync::Arc;
use tracing::{debug, warn};

/// A type-erased interceptor that can be stored in the chain.
pub type BoxedInterceptor = Arc<dyn Interceptor>;

/// The immutable, ordered interceptor registry.
///
/// # Example
///
/// ```
/// use rop_core::{ParameterSet, RequestContext};
/// use rop_interceptor::{FnInterceptor, InterceptorChain};
///
/// # tokio_test::block_on(async {
/// let chain = InterceptorChain::builder()
///     .register(FnInterceptor::new("late"))
///     .register(FnInterceptor::new("early").with_order(1))
///     .build();
/// assert_eq!(chain.names(), vec!["early", "late"]);
///
/// let mut ctx = RequestContext::new(ParameterSet::new());
/// let answer = chain
///     .dispatch(&mut ctx, |_ctx| Box::pin(async { Ok(42) }))
///     .await
///     .unwrap();
/// assert_eq!(answer, 42);
/// # });
/// ```
pub struct InterceptorChain {
    interceptors: Vec<BoxedInterceptor>,
}

impl InterceptorChain {
    /// Creates a new chain builder.
    #[must_use]
    pub fn builder() -> InterceptorChainBuilder {
        InterceptorChainBuilder::new()
    }

    /// Runs a request through the chain and the service handler.
    ///
    /// 1. The match set is taken once, so an interceptor whose
    ///    `before_service` ran also gets its `before_response`.
    /// 2. `before_service` hooks run in order; the first error is returned
    ///    and nothing else runs.
    /// 3. The handler runs. A handler error is returned as-is and no
    ///    post-hooks run.
    /// 4. `before_response` hooks run in order; the first error is returned.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a hook or by the handler.
    pub async fn dispatch<R, H>(&self, ctx: &mut RequestContext, handler: H) -> RopResult<R>
    where
        H: FnOnce(&mut RequestContext) -> BoxFuture<'static, RopResult<R>> + Send,
        R: Send,
    {
        let view: &RequestContext = ctx;
        let matched: Vec<&dyn Interceptor> = self
            .interceptors
            .iter()
            .map(|interceptor| &**interceptor)
            .filter(|interceptor| interceptor.is_match(view))
            .collect();

        debug!(
            request_id = %ctx.request_id(),
            method = ctx.method().unwrap_or_default(),
            matched = matched.len(),
            registered = self.interceptors.len(),
            "Dispatching request through interceptor chain"
        );

        for interceptor in &matched {
            if let Err(error) = interceptor.before_service(ctx).await {
                warn!(
                    request_id = %ctx.request_id(),
                    interceptor = interceptor.name(),
                    error = %error,
                    "Request aborted before service"
                );
                return Err(error);
            }
        }

        ctx.mark_service_begin();
        let result = handler(&mut *ctx).await;
        ctx.mark_service_end();
        let response = result?;

        for interceptor in &matched {
            if let Err(error) = interceptor.before_response(ctx).await {
                warn!(
                    request_id = %ctx.request_id(),
                    interceptor = interceptor.name(),
                    error = %error,
                    "Post-service hook failed"
                );
                return Err(error);
            }
        }

        Ok(response)
    }

    /// Returns the interceptor names in execution order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.interceptors.iter().map(|i| i.name()).collect()
    }

    /// Returns the number of registered interceptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    /// Returns `true` if no interceptors are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }
}

impl std::fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("interceptors", &self.names())
            .finish()
    }
}

/// Builder for constructing an [`InterceptorChain`].
///
/// Registration order only matters between interceptors of equal
/// [`order`](Interceptor::order).
#[derive(Default)]
pub struct InterceptorChainBuilder {
    interceptors: Vec<BoxedInterceptor>,
}

impl InterceptorChainBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an interceptor.
    #[must_use]
    pub fn register<I: Interceptor>(self, interceptor: I) -> Self {
        self.register_shared(Arc::new(interceptor))
    }

    /// Registers an interceptor that is already shared.
    #[must_use]
    pub fn register_shared(mut self, interceptor: BoxedInterceptor) -> Self {
        debug!(
            interceptor = interceptor.name(),
            order = interceptor.order(),
            "Registering interceptor"
        );
        self.interceptors.push(interceptor);
        self
    }

    /// Builds the chain.
    ///
    /// The sort is stable, so ties keep registration order.
    #[must_use]
    pub fn build(mut self) -> InterceptorChain {
        self.interceptors.sort_by_key(|interceptor| interceptor.order());
        InterceptorChain {
            interceptors: self.interceptors,
        }
    }
}
