//! Client locale resolution.
//!
//! Clients send a locale string such as `zh_CN` or `en`. Anything missing or
//! malformed falls back to simplified Chinese.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A language with an optional country.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locale {
    language: String,
    country: Option<String>,
}

impl Locale {
    /// Simplified Chinese (`zh_CN`), the fallback locale.
    #[must_use]
    pub fn simplified_chinese() -> Self {
        Self {
            language: "zh".to_string(),
            country: Some("CN".to_string()),
        }
    }

    /// English (`en`).
    #[must_use]
    pub fn english() -> Self {
        Self {
            language: "en".to_string(),
            country: None,
        }
    }

    /// Parses `ll`, `ll_CC` or `ll-CC`.
    ///
    /// The language must be 2 or 3 lowercase ASCII letters; the country 2
    /// uppercase ASCII letters or 3 digits.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = value.splitn(2, ['_', '-']);
        let language = parts.next()?;
        if !(2..=3).contains(&language.len()) || !language.bytes().all(|b| b.is_ascii_lowercase()) {
            return None;
        }

        let country = match parts.next() {
            None => None,
            Some(country) => {
                let letters = country.len() == 2 && country.bytes().all(|b| b.is_ascii_uppercase());
                let digits = country.len() == 3 && country.bytes().all(|b| b.is_ascii_digit());
                if !(letters || digits) {
                    return None;
                }
                Some(country.to_string())
            }
        };

        Some(Self {
            language: language.to_string(),
            country,
        })
    }

    /// The language code.
    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    /// The country code, if any.
    #[must_use]
    pub fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }

    /// Returns `true` for the locales the gateway ships messages for.
    #[must_use]
    pub fn is_supported(&self) -> bool {
        *self == Self::simplified_chinese() || *self == Self::english()
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self::simplified_chinese()
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.country {
            Some(country) => write!(f, "{}_{}", self.language, country),
            None => f.write_str(&self.language),
        }
    }
}

/// Resolves a client locale string, falling back to `zh_CN`.
#[must_use]
pub fn resolve_locale(value: Option<&str>) -> Locale {
    value.and_then(Locale::parse).unwrap_or_default()
}
