//! Request signing and verification.
//!
//! A signature is `uppercase(hex(digest(utf8(canonical string))))`. With the
//! SHA-1 digest this is always 40 characters.
//!
//! Both [`Signer::sign`] and [`Signer::verify`] are pure functions of their
//! inputs, so a single [`Signer`] can be shared across any number of
//! concurrent requests without locking.

use crate::canonical::{canonicalize, Secret};
use crate::error::{RopError, RopResult};
use crate::params::{IgnoredNames, ParameterSet};
use sha1::{Digest, Sha1};
use std::fmt;
use subtle::ConstantTimeEq;

/// Digest algorithms the signer can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DigestAlgorithm {
    /// SHA-1, 160-bit digest.
    #[default]
    Sha1,
}

impl DigestAlgorithm {
    /// Resolves an algorithm from its configured name.
    ///
    /// # Errors
    ///
    /// Returns [`RopError::SigningUnavailable`] if the runtime has no
    /// implementation for the named algorithm.
    pub fn from_name(name: &str) -> RopResult<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "sha1" | "sha-1" => Ok(Self::Sha1),
            _ => Err(RopError::signing_unavailable(name)),
        }
    }

    /// Digest length in bytes.
    #[must_use]
    pub const fn digest_len(self) -> usize {
        match self {
            Self::Sha1 => 20,
        }
    }

    /// Length of a hex-encoded signature produced with this algorithm.
    #[must_use]
    pub const fn signature_len(self) -> usize {
        self.digest_len() * 2
    }

    /// Canonical algorithm name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sha1 => "SHA-1",
        }
    }

    fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha1 => Sha1::digest(data).to_vec(),
        }
    }
}

/// Uppercase hexadecimal request signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature(String);

impl Signature {
    /// Wraps a signature string as received from a client.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the signature text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length of the signature in characters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the signature is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Compares two signatures without short-circuiting on the first differing byte.
    #[must_use]
    pub fn ct_matches(&self, other: &str) -> bool {
        let expected = self.0.as_bytes();
        let provided = other.as_bytes();
        if expected.len() != provided.len() {
            return false;
        }
        expected.ct_eq(provided).into()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Signature> for String {
    fn from(signature: Signature) -> Self {
        signature.0
    }
}

/// Computes and verifies request signatures.
///
/// # Example
///
/// ```
/// use rop_core::{IgnoredNames, ParameterSet, Secret, Signer};
///
/// let signer = Signer::default();
/// let params: ParameterSet = [("app_key", "123"), ("method", "user.get")]
///     .into_iter()
///     .collect();
/// let secret = Secret::new("SECRET");
///
/// let signature = signer.sign(&params, &IgnoredNames::new(), &secret).unwrap();
/// assert_eq!(signature.len(), 40);
/// assert!(signer.verify(&params, &IgnoredNames::new(), &secret, signature.as_str()).unwrap());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Signer {
    algorithm: DigestAlgorithm,
}

impl Signer {
    /// Creates a signer for the given algorithm.
    #[must_use]
    pub const fn new(algorithm: DigestAlgorithm) -> Self {
        Self { algorithm }
    }

    /// Creates a signer from a configured algorithm name.
    ///
    /// # Errors
    ///
    /// Returns [`RopError::SigningUnavailable`] for unsupported names. The
    /// gateway treats this as fatal at startup.
    pub fn from_algorithm_name(name: &str) -> RopResult<Self> {
        DigestAlgorithm::from_name(name).map(Self::new)
    }

    /// The digest algorithm in use.
    #[must_use]
    pub const fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Signs `params`, skipping every name in `ignored`.
    ///
    /// # Errors
    ///
    /// Returns [`RopError::InvalidParameter`] if a signed parameter has no value.
    pub fn sign(
        &self,
        params: &ParameterSet,
        ignored: &IgnoredNames,
        secret: &Secret,
    ) -> RopResult<Signature> {
        let canonical = canonicalize(params, ignored, secret)?;
        let digest = self.algorithm.digest(canonical.as_bytes());
        Ok(Signature(hex::encode_upper(digest)))
    }

    /// Recomputes the signature of `params` and compares it with `provided`.
    ///
    /// The comparison runs in constant time over the signature bytes.
    /// Signatures are compared exactly, so a lowercase rendering of the
    /// correct digest does not verify.
    ///
    /// # Errors
    ///
    /// Returns [`RopError::InvalidParameter`] if a signed parameter has no value.
    pub fn verify(
        &self,
        params: &ParameterSet,
        ignored: &IgnoredNames,
        secret: &Secret,
        provided: &str,
    ) -> RopResult<bool> {
        let expected = self.sign(params, ignored, secret)?;
        Ok(expected.ct_matches(provided))
    }

    /// Like [`verify`](Self::verify), but turns a mismatch into
    /// [`RopError::SignatureMismatch`] and returns the verified signature.
    ///
    /// # Errors
    ///
    /// Returns [`RopError::SignatureMismatch`] if the signatures differ, or
    /// [`RopError::InvalidParameter`] if a signed parameter has no value.
    pub fn verify_or_reject(
        &self,
        params: &ParameterSet,
        ignored: &IgnoredNames,
        secret: &Secret,
        provided: &str,
        app_key: &str,
    ) -> RopResult<Signature> {
        let expected = self.sign(params, ignored, secret)?;
        if expected.ct_matches(provided) {
            Ok(expected)
        } else {
            Err(RopError::signature_mismatch(app_key))
        }
    }
}

/// Signs with the default SHA-1 signer.
///
/// # Errors
///
/// See [`Signer::sign`].
pub fn sign(params: &ParameterSet, ignored: &IgnoredNames, secret: &Secret) -> RopResult<Signature> {
    Signer::default().sign(params, ignored, secret)
}

/// Verifies with the default SHA-1 signer.
///
/// # Errors
///
/// See [`Signer::verify`].
pub fn verify(
    params: &ParameterSet,
    ignored: &IgnoredNames,
    secret: &Secret,
    provided: &str,
) -> RopResult<bool> {
    Signer::default().verify(params, ignored, secret, provided)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn reference_params() -> ParameterSet {
        [("app_key", "123"), ("method", "user.get")]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_reference_signature() {
        let signature = sign(&reference_params(), &IgnoredNames::new(), &Secret::new("SECRET")).unwrap();
        let expected = hex::encode_upper(Sha1::digest(b"SECRETapp_key123methoduser.getSECRET"));
        assert_eq!(signature.as_str(), expected);
        assert_eq!(signature.len(), 40);
        assert!(signature
            .as_str()
            .chars()
            .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
    }

    #[test]
    fn test_known_vector() {
        // SHA-1("SECRETSECRET")
        let signature = sign(&ParameterSet::new(), &IgnoredNames::new(), &Secret::new("SECRET")).unwrap();
        assert_eq!(
            signature.as_str(),
            hex::encode_upper(Sha1::digest(b"SECRETSECRET"))
        );
    }

    #[test]
    fn test_sign_is_deterministic() {
        let secret = Secret::new("s3cr3t");
        let a = sign(&reference_params(), &IgnoredNames::new(), &secret).unwrap();
        let b = sign(&reference_params(), &IgnoredNames::new(), &secret).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_changing_value_changes_signature() {
        let secret = Secret::new("SECRET");
        let mut tampered = reference_params();
        tampered.insert("method", "user.delete");

        let original = sign(&reference_params(), &IgnoredNames::new(), &secret).unwrap();
        let changed = sign(&tampered, &IgnoredNames::new(), &secret).unwrap();
        assert_ne!(original, changed);
    }

    #[test]
    fn test_changing_name_changes_signature() {
        let secret = Secret::new("SECRET");
        let renamed: ParameterSet = [("app_key", "123"), ("methods", "user.get")]
            .into_iter()
            .collect();
        assert_ne!(
            sign(&reference_params(), &IgnoredNames::new(), &secret).unwrap(),
            sign(&renamed, &IgnoredNames::new(), &secret).unwrap()
        );
    }

    #[test]
    fn test_ignored_parameter_does_not_affect_signature() {
        let secret = Secret::new("SECRET");
        let mut extended = reference_params();
        extended.insert("sign", "whatever");
        let ignored: IgnoredNames = ["sign"].into_iter().collect();

        assert_eq!(
            sign(&extended, &ignored, &secret).unwrap(),
            sign(&reference_params(), &IgnoredNames::new(), &secret).unwrap()
        );
    }

    #[test]
    fn test_verify_detects_tampering() {
        let secret = Secret::new("SECRET");
        let signature = sign(&reference_params(), &IgnoredNames::new(), &secret).unwrap();

        let mut tampered = reference_params();
        tampered.insert("app_key", "124");
        assert!(!verify(&tampered, &IgnoredNames::new(), &secret, signature.as_str()).unwrap());
    }

    #[test]
    fn test_verify_rejects_wrong_secret() {
        let signature = sign(&reference_params(), &IgnoredNames::new(), &Secret::new("a")).unwrap();
        assert!(!verify(&reference_params(), &IgnoredNames::new(), &Secret::new("b"), signature.as_str()).unwrap());
    }

    #[test]
    fn test_verify_rejects_lowercase_and_truncated() {
        let secret = Secret::new("SECRET");
        let signature = sign(&reference_params(), &IgnoredNames::new(), &secret).unwrap();
        let lower = signature.as_str().to_ascii_lowercase();
        let truncated = &signature.as_str()[..39];

        assert!(!verify(&reference_params(), &IgnoredNames::new(), &secret, &lower).unwrap());
        assert!(!verify(&reference_params(), &IgnoredNames::new(), &secret, truncated).unwrap());
        assert!(!verify(&reference_params(), &IgnoredNames::new(), &secret, "").unwrap());
    }

    #[test]
    fn test_verify_or_reject() {
        let signer = Signer::default();
        let secret = Secret::new("SECRET");
        let signature = signer.sign(&reference_params(), &IgnoredNames::new(), &secret).unwrap();

        let verified = signer
            .verify_or_reject(&reference_params(), &IgnoredNames::new(), &secret, signature.as_str(), "123")
            .unwrap();
        assert_eq!(verified, signature);

        let error = signer
            .verify_or_reject(&reference_params(), &IgnoredNames::new(), &secret, "0000", "123")
            .unwrap_err();
        assert!(matches!(error, RopError::SignatureMismatch { ref app_key } if app_key == "123"));
    }

    #[test]
    fn test_algorithm_from_name() {
        assert_eq!(DigestAlgorithm::from_name("SHA-1").unwrap(), DigestAlgorithm::Sha1);
        assert_eq!(DigestAlgorithm::from_name("sha1").unwrap(), DigestAlgorithm::Sha1);
        assert_eq!(DigestAlgorithm::Sha1.signature_len(), 40);

        let error = Signer::from_algorithm_name("whirlpool").unwrap_err();
        assert!(error.is_fatal());
    }

    proptest! {
        #[test]
        fn prop_sign_then_verify(
            pairs in proptest::collection::hash_map("[a-zA-Z]{1,8}", "[ -~]{0,12}", 0..10),
            secret in "[ -~]{0,16}",
        ) {
            let params: ParameterSet = pairs.into_iter().collect();
            let secret = Secret::new(secret);
            let signature = sign(&params, &IgnoredNames::new(), &secret).unwrap();
            prop_assert_eq!(signature.len(), 40);
            prop_assert!(verify(&params, &IgnoredNames::new(), &secret, signature.as_str()).unwrap());
        }
    }
}
