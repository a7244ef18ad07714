//! # Rop Interceptor
//!
//! Ordered interceptor chain for the Rop gateway.
//!
//! Interceptors wrap every service call with pre- and post-processing.
//! Unlike a fixed middleware pipeline, the chain is open: any number of
//! interceptors can be registered, each choosing its own priority and
//! deciding per request whether it applies.
//!
//! ## Dispatch
//!
//! ```text
//! Request → [matching interceptors, ascending order].before_service → Handler
//!                                                                       ↓
//! Response ← [same interceptors, same order].before_response ←──────────┘
//! ```
//!
//! - The first `before_service` error aborts the request
//! - A handler error skips every `before_response`
//! - The chain is immutable once built and shared across requests
//!
//! ## Example
//!
//! ```
//! use rop_interceptor::{FnInterceptor, InterceptorChain};
//! use rop_interceptor::stages::{AccessControlInterceptor, AuditInterceptor};
//!
//! let chain = InterceptorChain::builder()
//!     .register(AuditInterceptor::default())
//!     .register(AccessControlInterceptor::builder().grant("00001", ["*"]).build())
//!     .register(FnInterceptor::new("tag").with_order(150))
//!     .build();
//!
//! assert_eq!(chain.names(), vec!["access_control", "tag", "audit"]);
//! ```

#![doc(html_root_url = "https://docs.rs/rop-interceptor/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod chain;
pub mod interceptor;
pub mod stages;

pub use chain::{BoxedInterceptor, InterceptorChain, InterceptorChainBuilder};
pub use interceptor::{BoxFuture, FnInterceptor, Interceptor, DEFAULT_ORDER};
