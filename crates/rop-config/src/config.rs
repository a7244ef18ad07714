//! Main configuration types.
//!
//! This module provides the top-level [`GatewayConfig`] struct and its builder.

use std::collections::BTreeMap;

use rop_core::SystemParams;
use serde::{Deserialize, Serialize};

use crate::schema::is_valid_log_filter;
use crate::{
    AccessConfig, AppConfig, AuditConfig, ConfigError, LogFormat, LoggingConfig, QuotaConfig,
    SigningConfig,
};

/// Complete gateway configuration.
///
/// This is the root configuration type that contains all configuration sections.
/// Use [`ConfigLoader`](crate::ConfigLoader) to load configuration from files
/// and environment variables.
///
/// # Example
///
/// ```
/// use rop_config::GatewayConfig;
///
/// let config = GatewayConfig::default();
/// assert!(config.signing.enabled);
/// assert_eq!(config.system_params.sign, "sign");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Request signing.
    #[serde(default)]
    pub signing: SigningConfig,

    /// Wire names of the system parameters.
    #[serde(default)]
    pub system_params: SystemParams,

    /// Registered apps keyed by app key.
    #[serde(default)]
    pub apps: BTreeMap<String, AppConfig>,

    /// Access control.
    #[serde(default)]
    pub access: AccessConfig,

    /// Per-app quota.
    #[serde(default)]
    pub quota: QuotaConfig,

    /// Audit log.
    #[serde(default)]
    pub audit: AuditConfig,

    /// Logging.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl GatewayConfig {
    /// Create a new configuration builder.
    ///
    /// # Example
    ///
    /// ```
    /// use rop_config::{AppConfig, GatewayConfig};
    ///
    /// let config = GatewayConfig::builder()
    ///     .app("00001", AppConfig::new("abcdeabcdeabcdeabcdeabcde"))
    ///     .build();
    ///
    /// assert!(config.apps.contains_key("00001"));
    /// ```
    #[must_use]
    pub fn builder() -> GatewayConfigBuilder {
        GatewayConfigBuilder::new()
    }

    /// Validate the configuration.
    ///
    /// The signing algorithm name is not checked here; the gateway refuses
    /// to start when it names an algorithm it cannot provide.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - A system parameter name is empty
    /// - An app has an empty secret
    /// - The quota is enabled with a zero limit or window
    /// - The log level is unknown
    pub fn validate(&self) -> Result<(), ConfigError> {
        let system = &self.system_params;
        for (field, name) in [
            ("system_params.app_key", &system.app_key),
            ("system_params.method", &system.method),
            ("system_params.version", &system.version),
            ("system_params.format", &system.format),
            ("system_params.locale", &system.locale),
            ("system_params.session_id", &system.session_id),
            ("system_params.sign", &system.sign),
        ] {
            if name.is_empty() {
                return Err(ConfigError::invalid_value(field, "parameter name must not be empty"));
            }
        }

        if let Some((app_key, _)) = self.apps.iter().find(|(_, app)| app.secret.is_empty()) {
            return Err(ConfigError::validation_error(format!(
                "app '{app_key}' has an empty secret"
            )));
        }

        if self.quota.enabled {
            if self.quota.limit == 0 {
                return Err(ConfigError::invalid_value("quota.limit", "must be greater than zero"));
            }
            if self.quota.window_secs == 0 {
                return Err(ConfigError::invalid_value(
                    "quota.window_secs",
                    "must be greater than zero",
                ));
            }
        }

        if !is_valid_log_filter(&self.logging.level) {
            return Err(ConfigError::invalid_value(
                "logging.level",
                format!("invalid log filter '{}'", self.logging.level),
            ));
        }

        Ok(())
    }

    /// Create a development configuration preset.
    ///
    /// This preset is optimized for local development with:
    /// - Pretty log formatting with ANSI colors
    /// - Debug log level
    /// - Access control and quota disabled
    ///
    /// # Example
    ///
    /// ```
    /// use rop_config::GatewayConfig;
    ///
    /// let config = GatewayConfig::development();
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();

        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config.logging.ansi_enabled = true;
        config.logging.include_location = true;

        config.access.enabled = false;
        config.quota.enabled = false;

        config
    }

    /// Create a production configuration preset.
    ///
    /// This preset is optimized for production with:
    /// - JSON log formatting
    /// - Info log level
    /// - Access control and quota enforced
    ///
    /// # Example
    ///
    /// ```
    /// use rop_config::GatewayConfig;
    ///
    /// let config = GatewayConfig::production();
    /// assert_eq!(config.logging.format, rop_config::LogFormat::Json);
    /// ```
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();

        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;
        config.logging.ansi_enabled = false;

        config.signing.enabled = true;
        config.access.enabled = true;
        config.quota.enabled = true;

        config
    }
}

/// Builder for [`GatewayConfig`].
#[derive(Debug, Default)]
pub struct GatewayConfigBuilder {
    signing: Option<SigningConfig>,
    system_params: Option<SystemParams>,
    apps: BTreeMap<String, AppConfig>,
    access: Option<AccessConfig>,
    quota: Option<QuotaConfig>,
    audit: Option<AuditConfig>,
    logging: Option<LoggingConfig>,
}

impl GatewayConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the signing configuration.
    #[must_use]
    pub fn signing(mut self, signing: SigningConfig) -> Self {
        self.signing = Some(signing);
        self
    }

    /// Set the system parameter names.
    #[must_use]
    pub fn system_params(mut self, system_params: SystemParams) -> Self {
        self.system_params = Some(system_params);
        self
    }

    /// Register an app.
    #[must_use]
    pub fn app(mut self, app_key: impl Into<String>, app: AppConfig) -> Self {
        self.apps.insert(app_key.into(), app);
        self
    }

    /// Set the access control configuration.
    #[must_use]
    pub fn access(mut self, access: AccessConfig) -> Self {
        self.access = Some(access);
        self
    }

    /// Set the quota configuration.
    #[must_use]
    pub fn quota(mut self, quota: QuotaConfig) -> Self {
        self.quota = Some(quota);
        self
    }

    /// Set the audit configuration.
    #[must_use]
    pub fn audit(mut self, audit: AuditConfig) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Set the logging configuration.
    #[must_use]
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Build the configuration.
    ///
    /// Any unset sections will use their default values.
    #[must_use]
    pub fn build(self) -> GatewayConfig {
        GatewayConfig {
            signing: self.signing.unwrap_or_default(),
            system_params: self.system_params.unwrap_or_default(),
            apps: self.apps,
            access: self.access.unwrap_or_default(),
            quota: self.quota.unwrap_or_default(),
            audit: self.audit.unwrap_or_default(),
            logging: self.logging.unwrap_or_default(),
        }
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if validation fails.
    pub fn build_validated(self) -> Result<GatewayConfig, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GatewayConfig::default();
        assert!(config.signing.enabled);
        assert_eq!(config.system_params.app_key, "appKey");
        assert!(config.apps.is_empty());
        assert!(!config.access.enabled);
        assert!(config.audit.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_all_sections() {
        let config = GatewayConfig::builder()
            .signing(SigningConfig {
                ignored_params: vec!["timestamp".to_string()],
                ..Default::default()
            })
            .app("00001", AppConfig::new("secret-1").with_methods(["user.get"]))
            .app("00002", AppConfig::new("secret-2"))
            .access(AccessConfig {
                enabled: true,
                allow_unlisted: false,
            })
            .quota(QuotaConfig {
                enabled: true,
                limit: 10,
                window_secs: 1,
            })
            .build();

        assert_eq!(config.signing.ignored_params, vec!["timestamp"]);
        assert_eq!(config.apps.len(), 2);
        assert_eq!(config.apps["00001"].methods, vec!["user.get"]);
        assert!(config.access.enabled);
        assert_eq!(config.quota.limit, 10);
        assert_eq!(config.audit.service_name, "rop-gateway");
    }

    #[test]
    fn test_validate_empty_secret() {
        let result = GatewayConfig::builder()
            .app("00001", AppConfig::new(""))
            .build_validated();

        assert!(result.unwrap_err().to_string().contains("00001"));
    }

    #[test]
    fn test_validate_zero_quota() {
        let config = GatewayConfig::builder()
            .quota(QuotaConfig {
                enabled: true,
                limit: 0,
                window_secs: 60,
            })
            .build();

        assert!(config.validate().unwrap_err().to_string().contains("quota.limit"));
    }

    #[test]
    fn test_zero_quota_ignored_when_disabled() {
        let config = GatewayConfig::builder()
            .quota(QuotaConfig {
                enabled: false,
                limit: 0,
                window_secs: 0,
            })
            .build();

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_system_param_name() {
        let config = GatewayConfig::builder()
            .system_params(SystemParams {
                sign: String::new(),
                ..Default::default()
            })
            .build();

        assert!(config.validate().unwrap_err().to_string().contains("system_params.sign"));
    }

    #[test]
    fn test_validate_log_level() {
        let config = GatewayConfig::builder()
            .logging(LoggingConfig {
                level: "verbose".to_string(),
                ..Default::default()
            })
            .build();

        assert!(config.validate().unwrap_err().to_string().contains("logging.level"));
    }

    #[test]
    fn test_validate_accepts_per_crate_directives() {
        let config = GatewayConfig::builder()
            .logging(LoggingConfig {
                level: "info,rop_interceptor=debug".to_string(),
                ..Default::default()
            })
            .build();

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unsupported_algorithm_passes_validation() {
        let config = GatewayConfig::builder()
            .signing(SigningConfig {
                algorithm: "md5".to_string(),
                ..Default::default()
            })
            .build();

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_development_preset() {
        let config = GatewayConfig::development();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.logging.ansi_enabled);
        assert!(!config.access.enabled);
        assert!(!config.quota.enabled);
    }

    #[test]
    fn test_production_preset() {
        let config = GatewayConfig::production();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(config.access.enabled);
        assert!(config.quota.enabled);
    }

    #[test]
    fn test_toml_round_trip_keeps_sections() {
        let config = GatewayConfig::builder()
            .app("00001", AppConfig::new("secret-1"))
            .build();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[signing]"));
        assert!(toml_str.contains("00001"));

        let parsed: GatewayConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let toml_str = r#"
            [signing]
            enabled = true
            salt = "value"
        "#;

        let result: Result<GatewayConfig, _> = toml::from_str(toml_str);
        assert!(result.is_err());
    }
}
