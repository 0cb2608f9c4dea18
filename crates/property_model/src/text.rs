//! Localized text values

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Text keyed by locale code ("en", "de", ...).
///
/// Backed by an ordered map so equality and serialized form do not depend on
/// insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalizedText(BTreeMap<String, String>);

impl LocalizedText {
    /// Create an empty localized text
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, locale: impl Into<String>, text: impl Into<String>) -> Self {
        self.set(locale, text);
        self
    }

    /// Set the text for a locale
    pub fn set(&mut self, locale: impl Into<String>, text: impl Into<String>) {
        self.0.insert(locale.into(), text.into());
    }

    /// Remove the text for a locale
    pub fn remove(&mut self, locale: &str) -> Option<String> {
        self.0.remove(locale)
    }

    /// Get the text for a locale
    pub fn get(&self, locale: &str) -> Option<&str> {
        self.0.get(locale).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over (locale, text) pairs in locale order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<L: Into<String>, T: Into<String>> FromIterator<(L, T)> for LocalizedText {
    fn from_iter<I: IntoIterator<Item = (L, T)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(l, t)| (l.into(), t.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_ignores_insertion_order() {
        let a = LocalizedText::new().with("en", "Color").with("de", "Farbe");
        let b = LocalizedText::new().with("de", "Farbe").with("en", "Color");
        assert_eq!(a, b);
        assert_eq!(serde_json::to_string(&a).unwrap(), serde_json::to_string(&b).unwrap());
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let text = LocalizedText::new().with("en", "Size");
        assert_eq!(serde_json::to_string(&text).unwrap(), r#"{"en":"Size"}"#);
    }
}
