//! App secret lookup.
//!
//! The gateway resolves each caller's signing secret through a
//! [`SecretStore`]. [`StaticSecretStore`] serves secrets from configuration;
//! deployments that keep secrets elsewhere implement the trait, or pass a
//! closure.

use std::collections::{BTreeMap, HashMap};

use rop_config::AppConfig;
use rop_core::Secret;

/// Source of per-app signing secrets.
///
/// # Example
///
/// ```
/// use rop::{Secret, SecretStore};
///
/// let store = |app_key: &str| (app_key == "00001").then(|| Secret::new("abcde"));
/// assert!(store.secret_for("00001").is_some());
/// assert!(store.secret_for("00002").is_none());
/// ```
pub trait SecretStore: Send + Sync + 'static {
    /// Returns the secret for `app_key`, or `None` for unknown apps.
    fn secret_for(&self, app_key: &str) -> Option<Secret>;
}

impl<F> SecretStore for F
where
    F: Fn(&str) -> Option<Secret> + Send + Sync + 'static,
{
    fn secret_for(&self, app_key: &str) -> Option<Secret> {
        self(app_key)
    }
}

/// In-memory secrets keyed by app key.
#[derive(Debug, Clone, Default)]
pub struct StaticSecretStore {
    secrets: HashMap<String, Secret>,
}

impl StaticSecretStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from the configured apps.
    #[must_use]
    pub fn from_apps(apps: &BTreeMap<String, AppConfig>) -> Self {
        apps.iter()
            .map(|(app_key, app)| (app_key.clone(), Secret::new(app.secret.clone())))
            .collect()
    }

    /// Adds or replaces the secret for `app_key`.
    #[must_use]
    pub fn with_secret(mut self, app_key: impl Into<String>, secret: impl Into<Secret>) -> Self {
        self.insert(app_key, secret);
        self
    }

    /// Adds or replaces the secret for `app_key`.
    pub fn insert(&mut self, app_key: impl Into<String>, secret: impl Into<Secret>) {
        self.secrets.insert(app_key.into(), secret.into());
    }

    /// Number of registered apps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    /// Returns `true` if no app is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }
}

impl<K, S> FromIterator<(K, S)> for StaticSecretStore
where
    K: Into<String>,
    S: Into<Secret>,
{
    fn from_iter<I: IntoIterator<Item = (K, S)>>(iter: I) -> Self {
        Self {
            secrets: iter
                .into_iter()
                .map(|(app_key, secret)| (app_key.into(), secret.into()))
                .collect(),
        }
    }
}

impl SecretStore for StaticSecretStore {
    fn secret_for(&self, app_key: &str) -> Option<Secret> {
        self.secrets.get(app_key).cloned()
    }
}
