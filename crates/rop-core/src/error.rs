//! Error types for the Rop gateway.
//!
//! Every failure in the signing and interceptor pipeline is a [`RopError`].
//! The core never swallows or renders errors; it hands them to the dispatch
//! layer, which maps [`ErrorCategory`] to a protocol-specific envelope.
//!
//! | Variant | Category | Recoverable |
//! |---|---|---|
//! | `SigningUnavailable` | `Internal` | no, prevents startup |
//! | `InvalidParameter` | `Validation` | yes |
//! | `SignatureMismatch` | `Authentication` | yes, never retried |
//! | `RequestParse` | `Validation` | yes |
//! | `InterceptorAbort` | set by the interceptor | yes |
//! | `Service` | `Internal` | yes |

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`RopError`].
pub type RopResult<T> = Result<T, RopError>;

/// Categories of errors for classification and handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed request or parameter.
    Validation,
    /// The caller could not be authenticated (bad signature, unknown app).
    Authentication,
    /// The caller is known but not allowed to perform the call.
    Authorization,
    /// The caller exceeded its quota.
    RateLimited,
    /// Gateway-side failure.
    Internal,
}

impl ErrorCategory {
    /// Returns the default HTTP status code for this error category.
    #[must_use]
    pub const fn default_status_code(&self) -> StatusCode {
        match self {
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::Authentication => StatusCode::UNAUTHORIZED,
            Self::Authorization => StatusCode::FORBIDDEN,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Standard error type for the gateway core.
#[derive(Error, Debug)]
pub enum RopError {
    /// The configured digest primitive is not available in this runtime.
    #[error("signing unavailable: digest algorithm '{algorithm}' is not supported")]
    SigningUnavailable {
        /// The algorithm name that could not be resolved.
        algorithm: String,
    },

    /// A parameter was malformed or carried no value.
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter {
        /// The offending parameter name.
        name: String,
        /// Human-readable explanation.
        message: String,
    },

    /// The client-supplied signature does not match the recomputed one.
    #[error("signature mismatch for app '{app_key}'")]
    SignatureMismatch {
        /// The app key the request claimed, or empty if none was sent.
        app_key: String,
    },

    /// The request could not be decoded into a parameter set.
    #[error(transparent)]
    RequestParse(#[from] RequestParseError),

    /// An interceptor vetoed the request.
    #[error("request aborted by interceptor '{interceptor}': {message}")]
    InterceptorAbort {
        /// Name of the interceptor that aborted.
        interceptor: String,
        /// How the dispatch layer should classify the rejection.
        category: ErrorCategory,
        /// Human-readable reason.
        message: String,
    },

    /// The backend handler failed.
    #[error("service error: {message}")]
    Service {
        /// Human-readable error message.
        message: String,
        /// The underlying error (not exposed to clients).
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl RopError {
    /// Creates a signing-unavailable error.
    #[must_use]
    pub fn signing_unavailable(algorithm: impl Into<String>) -> Self {
        Self::SigningUnavailable {
            algorithm: algorithm.into(),
        }
    }

    /// Creates an invalid-parameter error.
    #[must_use]
    pub fn invalid_parameter(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates a signature-mismatch error.
    #[must_use]
    pub fn signature_mismatch(app_key: impl Into<String>) -> Self {
        Self::SignatureMismatch {
            app_key: app_key.into(),
        }
    }

    /// Creates an interceptor abort.
    #[must_use]
    pub fn abort(
        interceptor: impl Into<String>,
        category: ErrorCategory,
        message: impl Into<String>,
    ) -> Self {
        Self::InterceptorAbort {
            interceptor: interceptor.into(),
            category,
            message: message.into(),
        }
    }

    /// Creates a service error.
    #[must_use]
    pub fn service(message: impl Into<String>) -> Self {
        Self::Service {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a service error with a source error.
    pub fn service_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Service {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::SigningUnavailable { .. } | Self::Service { .. } => ErrorCategory::Internal,
            Self::InvalidParameter { .. } | Self::RequestParse(_) => ErrorCategory::Validation,
            Self::SignatureMismatch { .. } => ErrorCategory::Authentication,
            Self::InterceptorAbort { category, .. } => *category,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.category().default_status_code()
    }

    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::SigningUnavailable { .. } => "SIGNING_UNAVAILABLE",
            Self::InvalidParameter { .. } => "INVALID_PARAMETER",
            Self::SignatureMismatch { .. } => "INVALID_SIGNATURE",
            Self::RequestParse(_) => "REQUEST_PARSE_ERROR",
            Self::InterceptorAbort { .. } => "REQUEST_ABORTED",
            Self::Service { .. } => "SERVICE_ERROR",
        }
    }

    /// Returns `true` if the error must stop the gateway from serving traffic.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::SigningUnavailable { .. })
    }
}

/// The request could not be decoded.
///
/// Keeps the raw, undecoded message so it can be audited even though no
/// [`RequestContext`](crate::RequestContext) was ever built for it.
#[derive(Error, Debug)]
#[error("failed to parse request: {message}")]
pub struct RequestParseError {
    raw_message: String,
    message: String,
    #[source]
    source: Option<anyhow::Error>,
}

impl RequestParseError {
    /// Creates a parse error carrying only the raw message.
    #[must_use]
    pub fn new(raw_message: impl Into<String>) -> Self {
        Self::with_message(raw_message, "")
    }

    /// Creates a parse error with a human-readable message.
    #[must_use]
    pub fn with_message(raw_message: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            raw_message: raw_message.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a parse error caused by a decoder failure.
    ///
    /// The message is taken from the cause.
    pub fn with_cause(raw_message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        let source = source.into();
        Self {
            raw_message: raw_message.into(),
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Creates a parse error with both a message and a cause.
    pub fn with_message_and_cause(
        raw_message: impl Into<String>,
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self {
            raw_message: raw_message.into(),
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// The undecoded request payload.
    #[must_use]
    pub fn raw_message(&self) -> &str {
        &self.raw_message
    }

    /// The human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}
