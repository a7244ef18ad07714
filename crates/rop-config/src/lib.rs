//! Typed configuration system for the Rop gateway.
//!
//! This crate provides a strongly-typed configuration system with support for:
//! - TOML and JSON configuration files
//! - `.env` files and environment variable overrides
//! - Strict validation (fails on unknown fields)
//! - Layered configuration (defaults → file → env)
//!
//! # Overview
//!
//! The configuration system is built around the [`GatewayConfig`] struct:
//!
//! - [`SigningConfig`] - Signature verification and extra ignored parameters
//! - [`SystemParams`] - Wire names of the system parameters
//! - [`AppConfig`] - Registered apps, their secrets and method grants
//! - [`AccessConfig`] / [`QuotaConfig`] / [`AuditConfig`] - Built-in interceptors
//! - [`LoggingConfig`] - Log level and format
//!
//! # Configuration File Format
//!
//! ```toml
//! [signing]
//! enabled = true
//! algorithm = "sha1"
//! ignored_params = ["timestamp"]
//!
//! [system_params]
//! app_key = "appKey"
//! sign = "sign"
//!
//! [apps.00001]
//! secret = "abcdeabcdeabcdeabcdeabcde"
//! methods = ["user.get", "user.list"]
//!
//! [access]
//! enabled = true
//!
//! [quota]
//! enabled = true
//! limit = 100
//! window_secs = 60
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```
//!
//! # Environment Variable Overrides
//!
//! Values can be overridden via environment variables using the format
//! `PREFIX__SECTION__KEY`. For example:
//!
//! - `ROP__SIGNING__ENABLED=false`
//! - `ROP__QUOTA__LIMIT=500`
//! - `ROP__APPS__00001__SECRET=abcdeabcdeabcdeabcdeabcde`

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::*;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use rop_core::SystemParams;
pub use schema::{
    AccessConfig, AppConfig, AuditConfig, LogFormat, LoggingConfig, QuotaConfig, SigningConfig,
};
