//! Request context types.
//!
//! The [`RequestContext`] carries all per-request state from decoding,
//! through signature verification and the interceptor chain, into the
//! service handler and back out through the post-hooks.

use crate::canonical::Secret;
use crate::params::{IgnoredNames, ParameterSet};
use crate::signer::Signature;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// A unique identifier for each request, using UUID v7.
///
/// UUID v7 is time-ordered, which makes it ideal for request tracking
/// and log correlation.
///
/// # Example
///
/// ```
/// use rop_core::RequestId;
///
/// let id = RequestId::new();
/// println!("Request ID: {}", id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new unique request ID using UUID v7.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `RequestId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Generates a random identifier rendered as uppercase UUID text.
///
/// Used for session and correlation identifiers handed to clients.
#[must_use]
pub fn generate_identifier() -> String {
    Uuid::new_v4().to_string().to_uppercase()
}

/// Names of the system-level parameters every call carries.
///
/// Clients send these alongside the business parameters. The names are
/// configurable so a deployment can keep the wire names its clients
/// already use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SystemParams {
    /// Application key identifying the caller.
    pub app_key: String,
    /// Service method name.
    pub method: String,
    /// Service method version.
    pub version: String,
    /// Response format requested by the client.
    pub format: String,
    /// Client locale.
    pub locale: String,
    /// Session identifier.
    pub session_id: String,
    /// Request signature.
    pub sign: String,
}

impl Default for SystemParams {
    fn default() -> Self {
        Self {
            app_key: "appKey".to_string(),
            method: "method".to_string(),
            version: "v".to_string(),
            format: "format".to_string(),
            locale: "locale".to_string(),
            session_id: "sessionId".to_string(),
            sign: "sign".to_string(),
        }
    }
}

type Attribute = Box<dyn Any + Send + Sync>;

/// Per-request context that flows through the interceptor chain.
///
/// The attribute bag lets interceptors hand values from `before_service`
/// to `before_response` (an audit timer, a quota ticket) without knowing
/// about each other.
///
/// # Example
///
/// ```
/// use rop_core::{ParameterSet, RequestContext};
///
/// let params: ParameterSet = [("method", "user.get"), ("v", "1.0")].into_iter().collect();
/// let mut ctx = RequestContext::new(params);
/// assert_eq!(ctx.method(), Some("user.get"));
///
/// ctx.set_attribute("audit.user", "alice".to_string());
/// assert_eq!(ctx.attribute::<String>("audit.user").map(String::as_str), Some("alice"));
/// ```
pub struct RequestContext {
    /// Unique identifier for this request.
    request_id: RequestId,

    /// Decoded request parameters.
    params: ParameterSet,

    /// Names excluded from signing.
    ignored: IgnoredNames,

    /// Wire names of the system parameters.
    system: SystemParams,

    /// Secret resolved for the calling app, if any.
    secret: Option<Secret>,

    /// Signature recomputed and verified by the gateway.
    signature: Option<Signature>,

    /// Raw request payload, when the decoder kept it.
    raw_message: Option<String>,

    /// String-keyed values shared between interceptors.
    attributes: HashMap<String, Attribute>,

    /// When the request was received.
    received_at: Instant,

    /// When the service handler was entered.
    service_began_at: Option<Instant>,

    /// When the service handler returned.
    service_ended_at: Option<Instant>,
}

impl RequestContext {
    /// Creates a context for `params` with default system parameter names.
    #[must_use]
    pub fn new(params: ParameterSet) -> Self {
        Self::with_system_params(params, SystemParams::default())
    }

    /// Creates a context using custom system parameter names.
    #[must_use]
    pub fn with_system_params(params: ParameterSet, system: SystemParams) -> Self {
        Self {
            request_id: RequestId::new(),
            params,
            ignored: IgnoredNames::new(),
            system,
            secret: None,
            signature: None,
            raw_message: None,
            attributes: HashMap::new(),
            received_at: Instant::now(),
            service_began_at: None,
            service_ended_at: None,
        }
    }

    /// Returns a new context with the given ignore-set.
    #[must_use]
    pub fn with_ignored(mut self, ignored: IgnoredNames) -> Self {
        self.ignored = ignored;
        self
    }

    /// Returns a new context carrying the raw request payload.
    #[must_use]
    pub fn with_raw_message(mut self, raw: impl Into<String>) -> Self {
        self.raw_message = Some(raw.into());
        self
    }

    /// Returns a new context with the specified request ID.
    #[must_use]
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = request_id;
        self
    }

    /// Returns the request ID.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the decoded parameters.
    #[must_use]
    pub const fn params(&self) -> &ParameterSet {
        &self.params
    }

    /// Returns one parameter value.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// Returns the names excluded from signing.
    #[must_use]
    pub const fn ignored(&self) -> &IgnoredNames {
        &self.ignored
    }

    /// Returns the system parameter names in use.
    #[must_use]
    pub const fn system_params(&self) -> &SystemParams {
        &self.system
    }

    /// The calling application's key.
    #[must_use]
    pub fn app_key(&self) -> Option<&str> {
        self.params.get(&self.system.app_key)
    }

    /// The requested service method.
    #[must_use]
    pub fn method(&self) -> Option<&str> {
        self.params.get(&self.system.method)
    }

    /// The requested service version.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.params.get(&self.system.version)
    }

    /// The requested response format.
    #[must_use]
    pub fn format(&self) -> Option<&str> {
        self.params.get(&self.system.format)
    }

    /// The client locale string, unparsed.
    #[must_use]
    pub fn locale(&self) -> Option<&str> {
        self.params.get(&self.system.locale)
    }

    /// The client session identifier.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.params.get(&self.system.session_id)
    }

    /// The signature the client sent.
    #[must_use]
    pub fn provided_signature(&self) -> Option<&str> {
        self.params.get(&self.system.sign)
    }

    /// The signature verified by the gateway, if verification ran.
    #[must_use]
    pub const fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    /// Records the verified signature.
    pub fn set_signature(&mut self, signature: Signature) {
        self.signature = Some(signature);
    }

    /// The secret resolved for the calling app.
    #[must_use]
    pub const fn secret(&self) -> Option<&Secret> {
        self.secret.as_ref()
    }

    /// Records the secret resolved for the calling app.
    pub fn set_secret(&mut self, secret: Secret) {
        self.secret = Some(secret);
    }

    /// The raw request payload, if kept.
    #[must_use]
    pub fn raw_message(&self) -> Option<&str> {
        self.raw_message.as_deref()
    }

    /// Stores an attribute, replacing any previous value under `key`.
    pub fn set_attribute<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.attributes.insert(key.into(), Box::new(value));
    }

    /// Returns an attribute if present and of type `T`.
    #[must_use]
    pub fn attribute<T: Any + Send + Sync>(&self, key: &str) -> Option<&T> {
        self.attributes.get(key).and_then(|v| v.downcast_ref())
    }

    /// Returns a mutable attribute if present and of type `T`.
    pub fn attribute_mut<T: Any + Send + Sync>(&mut self, key: &str) -> Option<&mut T> {
        self.attributes.get_mut(key).and_then(|v| v.downcast_mut())
    }

    /// Removes and returns an attribute of type `T`.
    ///
    /// An attribute of a different type is left in place.
    pub fn remove_attribute<T: Any + Send + Sync>(&mut self, key: &str) -> Option<T> {
        if !self.attributes.get(key).is_some_and(|v| v.is::<T>()) {
            return None;
        }
        self.attributes
            .remove(key)
            .and_then(|v| v.downcast().ok())
            .map(|v| *v)
    }

    /// Returns `true` if an attribute is stored under `key`.
    #[must_use]
    pub fn has_attribute(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    /// Number of stored attributes.
    #[must_use]
    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    /// Marks the moment the service handler is entered.
    pub fn mark_service_begin(&mut self) {
        self.service_began_at = Some(Instant::now());
    }

    /// Marks the moment the service handler returned.
    pub fn mark_service_end(&mut self) {
        self.service_ended_at = Some(Instant::now());
    }

    /// Time spent inside the service handler, once it has returned.
    #[must_use]
    pub fn service_duration(&self) -> Option<Duration> {
        match (self.service_began_at, self.service_ended_at) {
            (Some(begin), Some(end)) => Some(end.duration_since(begin)),
            _ => None,
        }
    }

    /// Returns the elapsed time since the request was received.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.received_at.elapsed()
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("request_id", &self.request_id)
            .field("params", &self.params)
            .field("ignored", &self.ignored)
            .field("signature", &self.signature)
            .field("attributes", &self.attributes.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
