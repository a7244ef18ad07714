//! Canonical string construction.
//!
//! The canonical string is the signing input for a request:
//!
//! ```text
//! secret ‖ name1 ‖ value1 ‖ name2 ‖ value2 ‖ … ‖ secret
//! ```
//!
//! Names are taken from the [`ParameterSet`], filtered through the
//! [`IgnoredNames`] and sorted by byte-wise ascending order. No delimiter or
//! length prefix separates names from values; existing signing clients
//! depend on this exact layout.

use crate::error::{RopError, RopResult};
use crate::params::{IgnoredNames, ParameterSet};
use std::fmt;

/// Shared secret known to a client and the gateway.
///
/// The `Debug` output is redacted so a secret can sit inside structs that
/// end up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wraps a secret string.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Returns the secret text.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl From<&str> for Secret {
    fn from(secret: &str) -> Self {
        Self::new(secret)
    }
}

impl From<String> for Secret {
    fn from(secret: String) -> Self {
        Self(secret)
    }
}

/// Builds the canonical string for `params`.
///
/// # Errors
///
/// Returns [`RopError::InvalidParameter`] if a parameter that survives
/// filtering has no value.
///
/// # Example
///
/// ```
/// use rop_core::{canonicalize, IgnoredNames, ParameterSet, Secret};
///
/// let params: ParameterSet = [("method", "user.get"), ("app_key", "123")]
///     .into_iter()
///     .collect();
/// let canonical = canonicalize(&params, &IgnoredNames::new(), &Secret::new("SECRET")).unwrap();
/// assert_eq!(canonical, "SECRETapp_key123methoduser.getSECRET");
/// ```
pub fn canonicalize(
    params: &ParameterSet,
    ignored: &IgnoredNames,
    secret: &Secret,
) -> RopResult<String> {
    let mut entries = params
        .iter()
        .filter(|(name, _)| !ignored.contains(name))
        .map(|(name, value)| {
            value
                .map(|value| (name, value))
                .ok_or_else(|| RopError::invalid_parameter(name, "parameter has no value"))
        })
        .collect::<RopResult<Vec<_>>>()?;

    entries.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));

    let secret = secret.expose();
    let capacity = secret.len() * 2
        + entries
            .iter()
            .map(|(name, value)| name.len() + value.len())
            .sum::<usize>();

    let mut canonical = String::with_capacity(capacity);
    canonical.push_str(secret);
    for (name, value) in entries {
        canonical.push_str(name);
        canonical.push_str(value);
    }
    canonical.push_str(secret);

    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn secret() -> Secret {
        Secret::new("SECRET")
    }

    #[test]
    fn test_reference_example() {
        let params: ParameterSet = [("app_key", "123"), ("method", "user.get")]
            .into_iter()
            .collect();
        let canonical = canonicalize(&params, &IgnoredNames::new(), &secret()).unwrap();
        assert_eq!(canonical, "SECRETapp_key123methoduser.getSECRET");
    }

    #[test]
    fn test_empty_set_wraps_secret_twice() {
        let canonical = canonicalize(&ParameterSet::new(), &IgnoredNames::new(), &secret()).unwrap();
        assert_eq!(canonical, "SECRETSECRET");
    }

    #[test]
    fn test_everything_ignored_wraps_secret_twice() {
        let params: ParameterSet = [("sign", "ABC")].into_iter().collect();
        let ignored: IgnoredNames = ["sign"].into_iter().collect();
        let canonical = canonicalize(&params, &ignored, &secret()).unwrap();
        assert_eq!(canonical, "SECRETSECRET");
    }

    #[test]
    fn test_ignored_names_are_excluded() {
        let params: ParameterSet = [("method", "user.get"), ("sign", "ABC"), ("v", "1.0")]
            .into_iter()
            .collect();
        let ignored: IgnoredNames = ["sign"].into_iter().collect();
        let canonical = canonicalize(&params, &ignored, &secret()).unwrap();
        assert_eq!(canonical, "SECRETmethoduser.getv1.0SECRET");
    }

    #[test]
    fn test_sort_is_byte_wise() {
        // Uppercase sorts before lowercase; no locale folding.
        let params: ParameterSet = [("b", "1"), ("B", "2"), ("a", "3"), ("_", "4")]
            .into_iter()
            .collect();
        let canonical = canonicalize(&params, &IgnoredNames::new(), &Secret::new("")).unwrap();
        assert_eq!(canonical, "B2_4a3b1");
    }

    #[test]
    fn test_absent_value_is_rejected() {
        let mut params = ParameterSet::new();
        params.insert("method", "user.get");
        params.insert_absent("format");

        let error = canonicalize(&params, &IgnoredNames::new(), &secret()).unwrap_err();
        match error {
            RopError::InvalidParameter { name, .. } => assert_eq!(name, "format"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_absent_value_of_ignored_name_is_allowed() {
        let mut params = ParameterSet::new();
        params.insert("method", "user.get");
        params.insert_absent("sign");
        let ignored: IgnoredNames = ["sign"].into_iter().collect();

        let canonical = canonicalize(&params, &ignored, &secret()).unwrap();
        assert_eq!(canonical, "SECRETmethoduser.getSECRET");
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let rendered = format!("{:?}", Secret::new("top-secret"));
        assert!(!rendered.contains("top-secret"));
    }

    proptest! {
        #[test]
        fn prop_insertion_order_does_not_matter(
            pairs in proptest::collection::hash_map("[a-zA-Z_]{1,8}", "[ -~]{0,8}", 0..12),
            secret in "[ -~]{0,16}",
        ) {
            let forward: ParameterSet = pairs.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            let mut reversed_pairs: Vec<_> = pairs.iter().collect();
            reversed_pairs.reverse();
            let reversed: ParameterSet = reversed_pairs
                .into_iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();

            let secret = Secret::new(secret);
            let ignored = IgnoredNames::new();
            prop_assert_eq!(
                canonicalize(&forward, &ignored, &secret).unwrap(),
                canonicalize(&reversed, &ignored, &secret).unwrap()
            );
        }

        #[test]
        fn prop_wrapped_by_secret(
            pairs in proptest::collection::hash_map("[a-z]{1,6}", "[a-z0-9]{0,6}", 0..8),
            secret in "[A-Z]{1,10}",
        ) {
            let params: ParameterSet = pairs.into_iter().collect();
            let canonical = canonicalize(&params, &IgnoredNames::new(), &Secret::new(secret.clone())).unwrap();
            prop_assert!(canonical.starts_with(&secret));
            prop_assert!(canonical.ends_with(&secret));
        }
    }
}
