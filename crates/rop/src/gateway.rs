//! The gateway facade.
//!
//! A [`Gateway`] owns everything a request needs before it reaches the
//! business handler: the signer, the secret store, the ignore-set and the
//! interceptor chain. It is built once at startup and shared; every call to
//! [`Gateway::handle`] gets its own [`RequestContext`].
//!
//! # Request Flow
//!
//! ```text
//! params → RequestContext → signature check → InterceptorChain::dispatch → handler
//! ```
//!
//! # Example
//!
//! ```
//! use rop::{Gateway, ParameterSet, Secret, StaticSecretStore};
//!
//! # tokio_test::block_on(async {
//! let gateway = Gateway::builder()
//!     .secret_store(StaticSecretStore::new().with_secret("00001", "abcde"))
//!     .build()
//!     .unwrap();
//!
//! let mut params: ParameterSet =
//!     [("appKey", "00001"), ("method", "user.get")].into_iter().collect();
//! let signature = rop::sign(&params, &rop::IgnoredNames::new(), &Secret::new("abcde")).unwrap();
//! params.insert("sign", signature.as_str());
//!
//! let reply = gateway
//!     .handle(params, |ctx| {
//!         let method = ctx.method().unwrap_or_default().to_string();
//!         Box::pin(async move { Ok(format!("called {method}")) })
//!     })
//!     .await
//!     .unwrap();
//! assert_eq!(reply, "called user.get");
//! # });
//! ```

use std::sync::Arc;
use std::time::Duration;

use rop_config::GatewayConfig;
use rop_core::{
    resolve_locale, IgnoredNames, ParameterSet, RequestContext, RequestParseError, RopError,
    RopResult, Secret, Signer, SystemParams,
};
use rop_interceptor::stages::{AccessControlInterceptor, AuditInterceptor, QuotaInterceptor};
use rop_interceptor::{
    BoxFuture, BoxedInterceptor, Interceptor, InterceptorChain, InterceptorChainBuilder,
};
use rop_telemetry::metrics;
use tracing::{debug, info, warn};

use crate::secret::{SecretStore, StaticSecretStore};

/// Attribute key of the resolved [`Locale`](rop_core::Locale).
pub const LOCALE_KEY: &str = "rop.locale";

/// The request-authentication and interception front of the gateway.
#[derive(Clone)]
pub struct Gateway {
    /// `None` when signature checks are disabled.
    signer: Option<Signer>,
    secrets: Arc<dyn SecretStore>,
    ignored: IgnoredNames,
    system: SystemParams,
    chain: Arc<InterceptorChain>,
}

impl Gateway {
    /// Creates a new gateway builder.
    #[must_use]
    pub fn builder() -> GatewayBuilder {
        GatewayBuilder::new()
    }

    /// Creates a builder preloaded from `config`.
    ///
    /// Registers the built-in interceptors the configuration enables; more
    /// can be added before [`GatewayBuilder::build`].
    #[must_use]
    pub fn builder_from_config(config: &GatewayConfig) -> GatewayBuilder {
        let mut builder = GatewayBuilder::new()
            .signing(config.signing.enabled)
            .algorithm(&config.signing.algorithm)
            .ignore_params(config.signing.ignored_params.iter().cloned())
            .system_params(config.system_params.clone())
            .secret_store(StaticSecretStore::from_apps(&config.apps));

        if config.access.enabled {
            let access = config
                .apps
                .iter()
                .filter(|(_, app)| !app.methods.is_empty())
                .fold(AccessControlInterceptor::builder(), |access, (app_key, app)| {
                    access.grant(app_key.clone(), app.methods.iter().cloned())
                })
                .allow_unlisted(config.access.allow_unlisted)
                .build();
            builder = builder.interceptor(access);
        }

        if config.quota.enabled {
            builder = builder.interceptor(
                QuotaInterceptor::builder()
                    .limit(config.quota.limit)
                    .window(Duration::from_secs(config.quota.window_secs))
                    .build(),
            );
        }

        if config.audit.enabled {
            builder = builder.interceptor(AuditInterceptor::new(config.audit.service_name.clone()));
        }

        builder
    }

    /// Builds a gateway from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`RopError::SigningUnavailable`] if the configured algorithm
    /// is not supported. The gateway cannot start without it.
    pub fn from_config(config: &GatewayConfig) -> RopResult<Self> {
        Self::builder_from_config(config).build()
    }

    /// Returns the interceptor chain.
    #[must_use]
    pub fn chain(&self) -> &InterceptorChain {
        &self.chain
    }

    /// Returns `true` if signatures are verified.
    #[must_use]
    pub const fn signing_enabled(&self) -> bool {
        self.signer.is_some()
    }

    /// Returns the names left out of every signature.
    #[must_use]
    pub const fn ignored_names(&self) -> &IgnoredNames {
        &self.ignored
    }

    /// Creates the context for a decoded request.
    #[must_use]
    pub fn new_context(&self, params: ParameterSet) -> RequestContext {
        let mut ctx = RequestContext::with_system_params(params, self.system.clone())
            .with_ignored(self.ignored.clone());
        let locale = resolve_locale(ctx.locale());
        ctx.set_attribute(LOCALE_KEY, locale);
        ctx
    }

    /// Authenticates a decoded request and runs it through the chain.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by signature verification, an
    /// interceptor, or the handler.
    pub async fn handle<R, H>(&self, params: ParameterSet, handler: H) -> RopResult<R>
    where
        H: FnOnce(&mut RequestContext) -> BoxFuture<'static, RopResult<R>> + Send,
        R: Send,
    {
        let mut ctx = self.new_context(params);
        self.handle_context(&mut ctx, handler).await
    }

    /// Like [`handle`](Self::handle), for a context the caller keeps.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by signature verification, an
    /// interceptor, or the handler.
    pub async fn handle_context<R, H>(&self, ctx: &mut RequestContext, handler: H) -> RopResult<R>
    where
        H: FnOnce(&mut RequestContext) -> BoxFuture<'static, RopResult<R>> + Send,
        R: Send,
    {
        if let Err(error) = self.authenticate(ctx) {
            rop_telemetry::log_request_rejected!(
                ctx.request_id(),
                ctx.app_key().unwrap_or_default(),
                error
            );
            metrics::record_rejection(error.error_code());
            return Err(error);
        }

        let result = self.chain.dispatch(ctx, handler).await;
        if let Err(error) = &result {
            if !matches!(error, RopError::Service { .. }) {
                metrics::record_rejection(error.error_code());
            }
        }
        result
    }

    /// Verifies the request signature and records the secret and verified
    /// signature on the context.
    ///
    /// The gateway's ignore-set is used, whatever the context carries.
    ///
    /// # Errors
    ///
    /// - [`RopError::InvalidParameter`] when the app key or signature is
    ///   missing, or a signed parameter has no value
    /// - [`RopError::SignatureMismatch`] for unknown apps and wrong signatures
    pub fn authenticate(&self, ctx: &mut RequestContext) -> RopResult<()> {
        let Some(signer) = self.signer else {
            return Ok(());
        };

        let app_key = ctx
            .app_key()
            .ok_or_else(|| RopError::invalid_parameter(&self.system.app_key, "app key is required"))?
            .to_string();
        let provided = ctx
            .provided_signature()
            .ok_or_else(|| RopError::invalid_parameter(&self.system.sign, "signature is required"))?
            .to_string();

        // Unknown apps get the same answer as a wrong signature.
        let secret: Secret = self
            .secrets
            .secret_for(&app_key)
            .ok_or_else(|| RopError::signature_mismatch(&app_key))?;

        let signature =
            signer.verify_or_reject(ctx.params(), &self.ignored, &secret, &provided, &app_key)?;

        debug!(
            request_id = %ctx.request_id(),
            app_key = %app_key,
            "Signature verified"
        );

        ctx.set_secret(secret);
        ctx.set_signature(signature);
        Ok(())
    }

    /// Rejects a request whose payload could not be decoded.
    ///
    /// The raw payload is kept on the returned error and in the log line.
    #[must_use]
    pub fn reject_unparsable(&self, raw: impl Into<String>, message: impl Into<String>) -> RopError {
        Self::log_unparsable(RequestParseError::with_message(raw, message))
    }

    /// Rejects an undecodable request, keeping the decoder's error as cause.
    #[must_use]
    pub fn reject_unparsable_with_cause(
        &self,
        raw: impl Into<String>,
        cause: impl Into<anyhow::Error>,
    ) -> RopError {
        Self::log_unparsable(RequestParseError::with_cause(raw, cause))
    }

    fn log_unparsable(error: RequestParseError) -> RopError {
        warn!(
            raw_message = error.raw_message(),
            error = %error.message(),
            "Unparsable request rejected"
        );
        let error = RopError::from(error);
        metrics::record_rejection(error.error_code());
        error
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("signer", &self.signer)
            .field("ignored", &self.ignored)
            .field("system", &self.system)
            .field("chain", &self.chain)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Gateway`].
pub struct GatewayBuilder {
    signing: bool,
    algorithm: String,
    ignored: IgnoredNames,
    system: SystemParams,
    secrets: Arc<dyn SecretStore>,
    chain: InterceptorChainBuilder,
}

impl Default for GatewayBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GatewayBuilder {
    /// Creates a builder with signing on, SHA-1, default parameter names,
    /// no apps and no interceptors.
    #[must_use]
    pub fn new() -> Self {
        Self {
            signing: true,
            algorithm: "sha1".to_string(),
            ignored: IgnoredNames::new(),
            system: SystemParams::default(),
            secrets: Arc::new(StaticSecretStore::new()),
            chain: InterceptorChain::builder(),
        }
    }

    /// Turns signature verification on or off.
    #[must_use]
    pub fn signing(mut self, enabled: bool) -> Self {
        self.signing = enabled;
        self
    }

    /// Sets the digest algorithm name.
    #[must_use]
    pub fn algorithm(mut self, name: impl Into<String>) -> Self {
        self.algorithm = name.into();
        self
    }

    /// Leaves `name` out of every signature.
    #[must_use]
    pub fn ignore_param(mut self, name: impl Into<String>) -> Self {
        self.ignored.insert(name);
        self
    }

    /// Leaves each of `names` out of every signature.
    #[must_use]
    pub fn ignore_params<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self.ignored.insert(name);
        }
        self
    }

    /// Sets the system parameter names.
    #[must_use]
    pub fn system_params(mut self, system: SystemParams) -> Self {
        self.system = system;
        self
    }

    /// Sets the secret store.
    #[must_use]
    pub fn secret_store(mut self, store: impl SecretStore) -> Self {
        self.secrets = Arc::new(store);
        self
    }

    /// Registers an interceptor.
    #[must_use]
    pub fn interceptor<I: Interceptor>(mut self, interceptor: I) -> Self {
        self.chain = self.chain.register(interceptor);
        self
    }

    /// Registers an interceptor that is already shared.
    #[must_use]
    pub fn shared_interceptor(mut self, interceptor: BoxedInterceptor) -> Self {
        self.chain = self.chain.register_shared(interceptor);
        self
    }

    /// Builds the gateway.
    ///
    /// The signature parameter is always added to the ignore-set.
    ///
    /// # Errors
    ///
    /// Returns [`RopError::SigningUnavailable`] when signing is enabled
    /// and the algorithm is not supported.
    pub fn build(mut self) -> RopResult<Gateway> {
        let signer = if self.signing {
            Some(Signer::from_algorithm_name(&self.algorithm).map_err(|error| {
                tracing::error!(algorithm = %self.algorithm, error = %error, "Signing unavailable");
                error
            })?)
        } else {
            None
        };

        self.ignored.insert(self.system.sign.clone());
        let chain = self.chain.build();

        info!(
            signing = signer.is_some(),
            interceptors = ?chain.names(),
            "Gateway ready"
        );

        Ok(Gateway {
            signer,
            secrets: self.secrets,
            ignored: self.ignored,
            system: self.system,
            chain: Arc::new(chain),
        })
    }
}

impl std::fmt::Debug for GatewayBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayBuilder")
            .field("signing", &self.signing)
            .field("algorithm", &self.algorithm)
            .field("ignored", &self.ignored)
            .field("system", &self.system)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rop_config::{AccessConfig, AppConfig, QuotaConfig, SigningConfig};
    use rop_core::{sign, ErrorCategory, Locale};

    const SECRET: &str = "abcdeabcdeabcdeabcdeabcde";

    fn signed(pairs: &[(&str, &str)]) -> ParameterSet {
        let mut params: ParameterSet = pairs.iter().copied().collect();
        let ignored: IgnoredNames = ["sign"].into_iter().collect();
        let signature = sign(&params, &ignored, &Secret::new(SECRET)).unwrap();
        params.insert("sign", signature.as_str());
        params
    }

    fn gateway() -> Gateway {
        Gateway::builder()
            .secret_store(StaticSecretStore::new().with_secret("00001", SECRET))
            .build()
            .unwrap()
    }

    #[test]
    fn test_sign_param_is_always_ignored() {
        let gateway = Gateway::builder().ignore_param("timestamp").build().unwrap();
        assert!(gateway.ignored_names().contains("sign"));
        assert!(gateway.ignored_names().contains("timestamp"));
    }

    #[test]
    fn test_unsupported_algorithm_is_fatal() {
        let error = Gateway::builder().algorithm("md5").build().unwrap_err();
        assert!(matches!(error, RopError::SigningUnavailable { .. }));
        assert!(error.is_fatal());
    }

    #[test]
    fn test_unsupported_algorithm_ignored_when_signing_disabled() {
        let gateway = Gateway::builder().signing(false).algorithm("md5").build().unwrap();
        assert!(!gateway.signing_enabled());
    }

    #[test]
    fn test_authenticate_records_signature() {
        let gateway = gateway();
        let mut ctx = gateway.new_context(signed(&[("appKey", "00001"), ("method", "user.get")]));
        gateway.authenticate(&mut ctx).unwrap();

        assert_eq!(ctx.signature().map(|s| s.as_str()), ctx.provided_signature());
        assert_eq!(ctx.secret().map(Secret::expose), Some(SECRET));
    }

    #[test]
    fn test_authenticate_foreign_context() {
        let gateway = Gateway::builder()
            .ignore_param("timestamp")
            .secret_store(StaticSecretStore::new().with_secret("00001", SECRET))
            .build()
            .unwrap();
        let mut params = signed(&[("appKey", "00001"), ("method", "user.get")]);
        params.insert("timestamp", "1700000000");

        let mut ctx = RequestContext::new(params);
        assert!(ctx.ignored().is_empty());
        gateway.authenticate(&mut ctx).unwrap();
        assert!(ctx.signature().is_some());
    }

    #[test]
    fn test_authenticate_missing_app_key() {
        let gateway = gateway();
        let mut ctx = gateway.new_context(signed(&[("method", "user.get")]));
        let error = gateway.authenticate(&mut ctx).unwrap_err();
        assert!(matches!(error, RopError::InvalidParameter { ref name, .. } if name == "appKey"));
    }

    #[test]
    fn test_authenticate_missing_signature() {
        let gateway = gateway();
        let params: ParameterSet = [("appKey", "00001")].into_iter().collect();
        let error = gateway.authenticate(&mut gateway.new_context(params)).unwrap_err();
        assert!(matches!(error, RopError::InvalidParameter { ref name, .. } if name == "sign"));
    }

    #[test]
    fn test_authenticate_unknown_app() {
        let gateway = gateway();
        let mut ctx = gateway.new_context(signed(&[("appKey", "ghost")]));
        let error = gateway.authenticate(&mut ctx).unwrap_err();
        assert_eq!(error.category(), ErrorCategory::Authentication);
    }

    #[test]
    fn test_locale_attribute() {
        let gateway = gateway();
        let ctx = gateway.new_context([("locale", "en")].into_iter().collect());
        assert_eq!(ctx.attribute::<Locale>(LOCALE_KEY), Some(&Locale::english()));

        let ctx = gateway.new_context(ParameterSet::new());
        assert_eq!(ctx.attribute::<Locale>(LOCALE_KEY), Some(&Locale::simplified_chinese()));
    }

    #[test]
    fn test_from_config_registers_enabled_interceptors() {
        let config = GatewayConfig::builder()
            .app("00001", AppConfig::new(SECRET).with_methods(["user.get"]))
            .access(AccessConfig {
                enabled: true,
                allow_unlisted: false,
            })
            .quota(QuotaConfig {
                enabled: true,
                limit: 10,
                window_secs: 60,
            })
            .build();

        let gateway = Gateway::from_config(&config).unwrap();
        assert_eq!(gateway.chain().names(), vec!["access_control", "quota", "audit"]);
    }

    #[test]
    fn test_from_config_unsupported_algorithm() {
        let config = GatewayConfig::builder()
            .signing(SigningConfig {
                algorithm: "sha256".to_string(),
                ..Default::default()
            })
            .build();

        assert!(matches!(
            Gateway::from_config(&config),
            Err(RopError::SigningUnavailable { ref algorithm }) if algorithm == "sha256"
        ));
    }

    #[test]
    fn test_reject_unparsable_keeps_raw_message() {
        let gateway = gateway();
        let error = gateway.reject_unparsable("<xml><broken", "unterminated element");
        match error {
            RopError::RequestParse(parse) => {
                assert_eq!(parse.raw_message(), "<xml><broken");
                assert_eq!(parse.message(), "unterminated element");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_reject_unparsable_with_cause() {
        let gateway = gateway();
        let cause = anyhow::anyhow!("expected value at line 1 column 2");
        let error = gateway.reject_unparsable_with_cause("{x", cause);
        assert_eq!(error.error_code(), "REQUEST_PARSE_ERROR");
        assert!(std::error::Error::source(&error).is_some());
    }
}
