//! Configuration loader with layered approach.
//!
//! This module provides the [`ConfigLoader`] for loading configuration from
//! multiple sources: defaults, files, `.env` files and environment variables.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

use crate::{AppConfig, ConfigError, GatewayConfig, LogFormat};

/// Configuration loader with layered approach.
///
/// The loader applies configuration in layers, with later layers overriding
/// earlier ones:
/// 1. Default values (built into the code)
/// 2. Configuration file (TOML or JSON)
/// 3. Environment variables, optionally seeded from a `.env` file
///
/// # Example
///
/// ```no_run
/// use rop_config::ConfigLoader;
///
/// # fn main() -> Result<(), rop_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_defaults()
///     .with_file("gateway.toml")?
///     .with_dotenv()?
///     .with_env_prefix("ROP")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: GatewayConfig,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: GatewayConfig::default(),
            env_prefix: None,
        }
    }

    /// Start with default configuration values.
    ///
    /// This is called automatically by `new()`, but can be chained for clarity.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = GatewayConfig::default();
        self
    }

    /// Start with development preset configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use rop_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_development()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = GatewayConfig::development();
        self
    }

    /// Start with production preset configuration.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = GatewayConfig::production();
        self
    }

    /// Load configuration from a file.
    ///
    /// Supports TOML (.toml) and JSON (.json) formats.
    /// The file format is determined by the file extension.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - The file does not exist
    /// - The file cannot be read
    /// - The file contains invalid TOML/JSON
    /// - The file contains unknown fields
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        self.config = Self::parse_file(&content, path)?;
        Ok(self)
    }

    /// Load configuration from an optional file.
    ///
    /// If the file exists, loads it. If not, silently continues.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be read or parsed.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load configuration from a string in `"toml"` or `"json"` format.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if parsing fails.
    ///
    /// # Example
    ///
    /// ```
    /// use rop_config::ConfigLoader;
    ///
    /// let toml = r#"
    ///     [apps.00001]
    ///     secret = "abcdeabcdeabcdeabcdeabcde"
    ///     methods = ["user.get"]
    /// "#;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string(toml, "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.apps["00001"].methods, vec!["user.get"]);
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = match format.to_lowercase().as_str() {
            "toml" => toml::from_str(content)?,
            "json" => serde_json::from_str(content)?,
            _ => {
                return Err(ConfigError::validation_error(format!(
                    "unsupported configuration format: {format}"
                )))
            }
        };
        Ok(self)
    }

    /// Set environment variable prefix for overrides.
    ///
    /// Environment variables use the format `PREFIX__SECTION__KEY`.
    /// For example, with prefix "ROP":
    /// - `ROP__SIGNING__ENABLED=false`
    /// - `ROP__QUOTA__LIMIT=500`
    /// - `ROP__APPS__00001__SECRET=abcde`
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Load a `.env` file from the current directory, if there is one.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a `.env` file exists but cannot be parsed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(error) if error.not_found() => Ok(self),
            Err(error) => Err(error.into()),
        }
    }

    /// Load environment variables from a specific `.env` file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing or cannot be parsed.
    pub fn with_dotenv_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        dotenvy::from_path(path.as_ref())?;
        Ok(self)
    }

    /// Finalize and return the loaded configuration.
    ///
    /// Applies environment variable overrides (if a prefix was set) and
    /// validates the final configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Environment variable parsing fails
    /// - Configuration validation fails
    pub fn load(mut self) -> Result<GatewayConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_overrides(&prefix)?;
        }

        self.config.validate()?;

        Ok(self.config)
    }

    /// Finalize without validation.
    #[must_use]
    pub fn load_unvalidated(self) -> GatewayConfig {
        self.config
    }

    fn parse_file(content: &str, path: &Path) -> Result<GatewayConfig, ConfigError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some("toml") => Ok(toml::from_str(content)?),
            Some("json") => Ok(serde_json::from_str(content)?),
            _ => Err(ConfigError::validation_error(format!(
                "unsupported configuration file format: {}",
                path.display()
            ))),
        }
    }

    fn apply_env_overrides(&mut self, prefix: &str) -> Result<(), ConfigError> {
        self.apply_env_vars(env::vars(), prefix)
    }

    /// Applies every `{prefix}__*` variable; other variables are skipped.
    fn apply_env_vars<I>(&mut self, vars: I, prefix: &str) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let section_prefix = format!("{prefix}__");
        let env_vars: HashMap<String, String> = vars
            .into_iter()
            .filter(|(k, _)| k.starts_with(&section_prefix))
            .collect();

        for (key, value) in env_vars {
            self.apply_env_var(&key, &value, prefix)?;
        }

        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let key_without_prefix = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
            .ok_or_else(|| ConfigError::env_parse_error(key, "invalid key format"))?;

        let parts: Vec<&str> = key_without_prefix.split("__").collect();
        let config = &mut self.config;

        match parts.as_slice() {
            // Signing section
            ["SIGNING", "ENABLED"] => {
                config.signing.enabled = parse_bool_var(key, value)?;
            }
            ["SIGNING", "ALGORITHM"] => {
                config.signing.algorithm = value.to_string();
            }
            ["SIGNING", "IGNORED_PARAMS"] => {
                config.signing.ignored_params = parse_list(value);
            }

            // System parameter names
            ["SYSTEM_PARAMS", "APP_KEY"] => config.system_params.app_key = value.to_string(),
            ["SYSTEM_PARAMS", "METHOD"] => config.system_params.method = value.to_string(),
            ["SYSTEM_PARAMS", "VERSION"] => config.system_params.version = value.to_string(),
            ["SYSTEM_PARAMS", "FORMAT"] => config.system_params.format = value.to_string(),
            ["SYSTEM_PARAMS", "LOCALE"] => config.system_params.locale = value.to_string(),
            ["SYSTEM_PARAMS", "SESSION_ID"] => config.system_params.session_id = value.to_string(),
            ["SYSTEM_PARAMS", "SIGN"] => config.system_params.sign = value.to_string(),

            // Apps
            ["APPS", app_key, "SECRET"] => {
                config
                    .apps
                    .entry((*app_key).to_string())
                    .or_insert_with(AppConfig::default)
                    .secret = value.to_string();
            }
            ["APPS", app_key, "METHODS"] => {
                config
                    .apps
                    .entry((*app_key).to_string())
                    .or_insert_with(AppConfig::default)
                    .methods = parse_list(value);
            }

            // Access section
            ["ACCESS", "ENABLED"] => {
                config.access.enabled = parse_bool_var(key, value)?;
            }
            ["ACCESS", "ALLOW_UNLISTED"] => {
                config.access.allow_unlisted = parse_bool_var(key, value)?;
            }

            // Quota section
            ["QUOTA", "ENABLED"] => {
                config.quota.enabled = parse_bool_var(key, value)?;
            }
            ["QUOTA", "LIMIT"] => {
                config.quota.limit = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))?;
            }
            ["QUOTA", "WINDOW_SECS"] => {
                config.quota.window_secs = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))?;
            }

            // Audit section
            ["AUDIT", "ENABLED"] => {
                config.audit.enabled = parse_bool_var(key, value)?;
            }
            ["AUDIT", "SERVICE_NAME"] => {
                config.audit.service_name = value.to_string();
            }

            // Logging section
            ["LOGGING", "ENABLED"] => {
                config.logging.enabled = parse_bool_var(key, value)?;
            }
            ["LOGGING", "LEVEL"] => {
                config.logging.level = value.to_string();
            }
            ["LOGGING", "FORMAT"] => {
                config.logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'json' or 'pretty'",
                        ))
                    }
                };
            }
            ["LOGGING", "ANSI_ENABLED"] => {
                config.logging.ansi_enabled = parse_bool_var(key, value)?;
            }
            ["LOGGING", "INCLUDE_LOCATION"] => {
                config.logging.include_location = parse_bool_var(key, value)?;
            }

            // Unknown key - ignore
            _ => {}
        }

        Ok(())
    }
}

/// Parse a boolean from a string.
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_bool_var(key: &str, value: &str) -> Result<bool, ConfigError> {
    parse_bool(value).ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))
}

/// Parse a comma-separated list, dropping empty items.
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_loader_new() {
        let config = ConfigLoader::new().load().unwrap();
        assert_eq!(config, GatewayConfig::default());
    }

    #[test]
    fn test_loader_with_development() {
        let config = ConfigLoader::new().with_development().load().unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_loader_with_production() {
        let config = ConfigLoader::new().with_production().load().unwrap();
        assert!(config.quota.enabled);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_loader_with_string_json() {
        let json = r#"{"signing": {"ignored_params": ["timestamp"]}, "apps": {"00001": {"secret": "s"}}}"#;

        let config = ConfigLoader::new()
            .with_string(json, "json")
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config.signing.ignored_params, vec!["timestamp"]);
        assert_eq!(config.apps["00001"].secret, "s");
    }

    #[test]
    fn test_loader_with_string_unknown_format() {
        let result = ConfigLoader::new().with_string("", "yaml");
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_loader_with_file_not_found() {
        let result = ConfigLoader::new().with_file("/nonexistent/gateway.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_loader_with_optional_file_not_found() {
        let config = ConfigLoader::new()
            .with_optional_file("/nonexistent/gateway.toml")
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config, GatewayConfig::default());
    }

    #[test]
    fn test_loader_with_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
            [signing]
            ignored_params = ["timestamp"]

            [system_params]
            app_key = "app_key"

            [apps.00001]
            secret = "abcdeabcdeabcdeabcdeabcde"
            methods = ["user.get"]

            [quota]
            enabled = true
            limit = 5
            "#
        )
        .unwrap();

        let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();

        assert_eq!(config.system_params.app_key, "app_key");
        assert_eq!(config.system_params.method, "method");
        assert_eq!(config.apps["00001"].methods, vec!["user.get"]);
        assert_eq!(config.quota.limit, 5);
        assert_eq!(config.quota.window_secs, 60);
    }

    #[test]
    fn test_loader_with_unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        let result = ConfigLoader::new().with_file(file.path());
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_loader_with_dotenv_file_not_found() {
        let result = ConfigLoader::new().with_dotenv_file("/nonexistent/.env");
        assert!(matches!(result, Err(ConfigError::Dotenv(_))));
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("YES"), Some(true));
        assert_eq!(parse_bool("on"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
        assert_eq!(parse_bool(""), None);
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(parse_list("a, b,,c "), vec!["a", "b", "c"]);
        assert!(parse_list("").is_empty());
    }

    // Overrides go through apply_env_var directly; setting real process
    // environment variables needs unsafe code, which the workspace forbids.

    #[test]
    fn test_apply_env_var_signing() {
        let mut loader = ConfigLoader::new();
        loader.apply_env_var("TEST__SIGNING__ENABLED", "false", "TEST").unwrap();
        loader.apply_env_var("TEST__SIGNING__IGNORED_PARAMS", "timestamp,nonce", "TEST").unwrap();
        assert!(!loader.config.signing.enabled);
        assert_eq!(loader.config.signing.ignored_params, vec!["timestamp", "nonce"]);
    }

    #[test]
    fn test_apply_env_var_apps() {
        let mut loader = ConfigLoader::new();
        loader.apply_env_var("TEST__APPS__00001__SECRET", "abcde", "TEST").unwrap();
        loader.apply_env_var("TEST__APPS__00001__METHODS", "user.get,user.list", "TEST").unwrap();
        let app = &loader.config.apps["00001"];
        assert_eq!(app.secret, "abcde");
        assert_eq!(app.methods, vec!["user.get", "user.list"]);
    }

    #[test]
    fn test_apply_env_var_system_params() {
        let mut loader = ConfigLoader::new();
        loader.apply_env_var("TEST__SYSTEM_PARAMS__SIGN", "signature", "TEST").unwrap();
        assert_eq!(loader.config.system_params.sign, "signature");
    }

    #[test]
    fn test_apply_env_var_invalid_integer() {
        let mut loader = ConfigLoader::new();
        let result = loader.apply_env_var("TEST__QUOTA__LIMIT", "lots", "TEST");
        assert!(matches!(result, Err(ConfigError::EnvParseError { .. })));
    }

    #[test]
    fn test_apply_env_var_log_format() {
        let mut loader = ConfigLoader::new();
        loader.apply_env_var("TEST__LOGGING__FORMAT", "pretty", "TEST").unwrap();
        assert_eq!(loader.config.logging.format, LogFormat::Pretty);
        assert!(loader.apply_env_var("TEST__LOGGING__FORMAT", "xml", "TEST").is_err());
    }

    #[test]
    fn test_env_vars_sharing_prefix_are_skipped() {
        let vars = [
            ("ROPE_HOME".to_string(), "/opt/rope".to_string()),
            ("ROP".to_string(), "1".to_string()),
            ("ROP_LEVEL".to_string(), "trace".to_string()),
            ("ROP__QUOTA__LIMIT".to_string(), "7".to_string()),
        ];

        let mut loader = ConfigLoader::new();
        loader.apply_env_vars(vars, "ROP").unwrap();
        assert_eq!(loader.config.quota.limit, 7);
        assert_eq!(loader.config.logging.level, "info");
    }

    #[test]
    fn test_apply_env_var_unknown_key_ignored() {
        let mut loader = ConfigLoader::new();
        loader.apply_env_var("TEST__SERVER__PORT", "8080", "TEST").unwrap();
        assert_eq!(loader.config, GatewayConfig::default());
    }
}
