//! Request parameter sets.
//!
//! A [`ParameterSet`] is the decoded form of an inbound call: a map from
//! parameter name to value. The decoding layer may name a parameter without
//! giving it a value (`a&b=1` decodes `a` with no value), so values are
//! stored as `Option<String>` and the absence is kept visible to the
//! canonicalizer instead of being coerced to a placeholder.

use std::collections::hash_map::{self, HashMap};
use std::collections::HashSet;

/// String-keyed, string-valued parameters of a single request.
///
/// Keys are unique and insertion order carries no meaning.
///
/// # Example
///
/// ```
/// use rop_core::ParameterSet;
///
/// let mut params = ParameterSet::new();
/// params.insert("method", "user.get");
/// params.insert_absent("callback");
///
/// assert_eq!(params.get("method"), Some("user.get"));
/// assert_eq!(params.get("callback"), None);
/// assert!(params.contains("callback"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSet {
    values: HashMap<String, Option<String>>,
}

impl ParameterSet {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a parameter, replacing any previous value for the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.values
            .insert(name.into(), Some(value.into()))
            .flatten()
    }

    /// Records a parameter name that was present without a value.
    pub fn insert_absent(&mut self, name: impl Into<String>) {
        self.values.insert(name.into(), None);
    }

    /// Returns the value of a parameter.
    ///
    /// Both a missing name and a name without a value yield `None`; use
    /// [`contains`](Self::contains) to tell them apart.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Option::as_deref)
    }

    /// Returns the raw entry for a name, distinguishing "no value" from "no name".
    #[must_use]
    pub fn entry(&self, name: &str) -> Option<Option<&str>> {
        self.values.get(name).map(Option::as_deref)
    }

    /// Returns `true` if the name was decoded, with or without a value.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Removes a parameter, returning its value if it had one.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.values.remove(name).flatten()
    }

    /// Number of parameter names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over parameter names in unspecified order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Iterates over `(name, value)` entries in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.values
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_deref()))
    }
}

impl<K, V> FromIterator<(K, V)> for ParameterSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        params.extend(iter);
        params
    }
}

impl<K, V> Extend<(K, V)> for ParameterSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.insert(name, value);
        }
    }
}

impl From<HashMap<String, String>> for ParameterSet {
    fn from(map: HashMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}

impl IntoIterator for ParameterSet {
    type Item = (String, Option<String>);
    type IntoIter = hash_map::IntoIter<String, Option<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

/// Parameter names that never take part in the canonical string.
///
/// Typically the signature parameter itself plus any unsigned metadata
/// listed in gateway configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoredNames(HashSet<String>);

impl IgnoredNames {
    /// Creates an empty ignore-set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a name to the set.
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.0.insert(name.into())
    }

    /// Returns `true` if `name` is ignored.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    /// Number of ignored names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if nothing is ignored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for IgnoredNames {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}
