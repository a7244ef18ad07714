//! # Rop Core
//!
//! Core types for the Rop API gateway.
//!
//! This crate provides the request-authentication building blocks that the
//! rest of the gateway is built on:
//!
//! - [`ParameterSet`] - Decoded request parameters
//! - [`canonicalize`] - Deterministic, secret-wrapped signing input
//! - [`Signer`] - SHA-1 signatures with constant-time verification
//! - [`RequestContext`] - Per-request parameters, attributes and timing
//! - [`RopError`] - Error taxonomy shared by every crate
//!
//! ## Signing
//!
//! ```text
//! signature = uppercase(hex(sha1(secret ‖ k1 ‖ v1 ‖ … ‖ kn ‖ vn ‖ secret)))
//! ```
//!
//! Parameter names are sorted byte-wise; names in the ignore-set (usually
//! the signature parameter itself) are left out.

#![doc(html_root_url = "https://docs.rs/rop-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod canonical;
mod context;
mod error;
pub mod locale;
mod params;
mod signer;

pub use canonical::{canonicalize, Secret};
pub use context::{generate_identifier, RequestContext, RequestId, SystemParams};
pub use error::{ErrorCategory, RequestParseError, RopError, RopResult};
pub use locale::{resolve_locale, Locale};
pub use params::{IgnoredNames, ParameterSet};
pub use signer::{sign, verify, DigestAlgorithm, Signature, Signer};
