//! Configuration schema types.
//!
//! This module defines the structure of all configuration sections.

use serde::{Deserialize, Serialize};

/// Request signing section.
///
/// # Example
///
/// ```
/// use rop_config::SigningConfig;
///
/// let config = SigningConfig::default();
/// assert!(config.enabled);
/// assert_eq!(config.algorithm, "sha1");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SigningConfig {
    /// Verify request signatures.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Digest algorithm name.
    #[serde(default = "default_algorithm")]
    pub algorithm: String,

    /// Parameter names left out of the signature, in addition to the
    /// signature parameter itself.
    #[serde(default)]
    pub ignored_params: Vec<String>,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            algorithm: default_algorithm(),
            ignored_params: Vec::new(),
        }
    }
}

fn default_algorithm() -> String {
    "sha1".to_string()
}

/// A registered client application.
///
/// ```toml
/// [apps.00001]
/// secret = "abcdeabcdeabcdeabcdeabcde"
/// methods = ["user.get", "user.list"]
/// ```
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Shared signing secret.
    pub secret: String,

    /// Service methods the app may call; `"*"` allows all.
    #[serde(default)]
    pub methods: Vec<String>,
}

impl AppConfig {
    /// Creates an app entry with `secret` and no method grants.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            methods: Vec::new(),
        }
    }

    /// Adds method grants.
    #[must_use]
    pub fn with_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.methods.extend(methods.into_iter().map(Into::into));
        self
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("secret", &"***")
            .field("methods", &self.methods)
            .finish()
    }
}

/// Access control section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct AccessConfig {
    /// Check app method grants before the service runs.
    #[serde(default)]
    pub enabled: bool,

    /// Let apps with no method grants call every method.
    #[serde(default)]
    pub allow_unlisted: bool,
}

/// Per-app quota section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct QuotaConfig {
    /// Enforce the quota.
    #[serde(default)]
    pub enabled: bool,

    /// Calls allowed per window and app.
    #[serde(default = "default_quota_limit")]
    pub limit: u64,

    /// Window length in seconds.
    #[serde(default = "default_quota_window")]
    pub window_secs: u64,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            limit: default_quota_limit(),
            window_secs: default_quota_window(),
        }
    }
}

fn default_quota_limit() -> u64 {
    100
}

fn default_quota_window() -> u64 {
    60
}

/// Audit log section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Write an audit record for each served request.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Service name attached to audit records.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            service_name: default_service_name(),
        }
    }
}

fn default_service_name() -> String {
    "rop-gateway".to_string()
}

/// Log format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON formatted logs (production).
    #[default]
    Json,
    /// Human-readable pretty format (development).
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log filter: a level (`info`) or comma-separated directives
    /// (`info,rop_interceptor=debug`).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include ANSI color codes in output.
    #[serde(default)]
    pub ansi_enabled: bool,

    /// Include source file and line in logs.
    #[serde(default)]
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            ansi_enabled: false,
            include_location: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

/// Checks a log filter in `tracing` directive form.
///
/// Each comma-separated directive is a level, or `target=level`. Bare
/// targets are rejected so a misspelled level does not pass silently.
pub(crate) fn is_valid_log_filter(filter: &str) -> bool {
    let is_level = |level: &str| LOG_LEVELS.contains(&level.trim().to_lowercase().as_str());

    let mut directives = filter.split(',').map(str::trim).filter(|d| !d.is_empty()).peekable();
    if directives.peek().is_none() {
        return false;
    }

    directives.all(|directive| match directive.rsplit_once('=') {
        Some((target, level)) => !target.trim().is_empty() && is_level(level),
        None => is_level(directive),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signing_defaults() {
        let config = SigningConfig::default();
        assert!(config.enabled);
        assert_eq!(config.algorithm, "sha1");
        assert!(config.ignored_params.is_empty());
    }

    #[test]
    fn test_app_secret_is_redacted() {
        let app = AppConfig::new("abcdeabcdeabcdeabcdeabcde").with_methods(["user.get"]);
        let debug = format!("{app:?}");
        assert!(!debug.contains("abcde"));
        assert!(debug.contains("user.get"));
    }

    #[test]
    fn test_app_methods_default_to_empty() {
        let app: AppConfig = toml::from_str(r#"secret = "s""#).unwrap();
        assert!(app.methods.is_empty());
    }

    #[test]
    fn test_quota_defaults() {
        let config = QuotaConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.limit, 100);
        assert_eq!(config.window_secs, 60);
    }

    #[test]
    fn test_log_filter_directives() {
        assert!(is_valid_log_filter("info"));
        assert!(is_valid_log_filter("WARN"));
        assert!(is_valid_log_filter("info,rop_interceptor=debug"));
        assert!(is_valid_log_filter("rop_core=trace, rop_config=off"));

        assert!(!is_valid_log_filter(""));
        assert!(!is_valid_log_filter(" , "));
        assert!(!is_valid_log_filter("verbose"));
        assert!(!is_valid_log_filter("rop_core=loud"));
        assert!(!is_valid_log_filter("=debug"));
    }

    #[test]
    fn test_log_format_serde() {
        let json = serde_json::to_string(&LogFormat::Pretty).unwrap();
        assert_eq!(json, "\"pretty\"");
        let format: LogFormat = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(format, LogFormat::Json);
    }

    #[test]
    fn test_unknown_section_field_rejected() {
        let result: Result<QuotaConfig, _> = toml::from_str("limit = 5\nburst = 2");
        assert!(result.is_err());
    }
}
