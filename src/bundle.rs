//! ARB localization bundle.
//!
//! A bundle is an ordered JSON object. Keys starting with `@` carry metadata
//! (`@@locale` for the bundle language, `@<key>` for the description object of
//! `<key>`); every other key is a translatable entry.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key holding the bundle's locale tag.
pub const LOCALE_KEY: &str = "@@locale";

/// Returns true for metadata keys (`@@locale`, `@greeting`, ...).
pub fn is_metadata_key(key: &str) -> bool {
    key.starts_with('@')
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BundleError {
    #[error("Content must be a JSON object")]
    NotAnObject,
}

/// An ARB bundle with its key order preserved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalizationBundle(Map<String, Value>);

impl LocalizationBundle {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Accept arbitrary JSON at the boundary; only objects are bundles.
    pub fn from_value(value: Value) -> Result<Self, BundleError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(BundleError::NotAnObject),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Pretty JSON with non-ASCII text kept as-is.
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// The `@@locale` tag, if present and a string.
    pub fn locale(&self) -> Option<&str> {
        self.0.get(LOCALE_KEY).and_then(Value::as_str)
    }

    pub fn set_locale(&mut self, locale: &str) {
        self.0
            .insert(LOCALE_KEY.to_string(), Value::String(locale.to_string()));
    }

    /// Translatable entries in bundle order.
    pub fn messages(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter().filter(|(key, _)| !is_metadata_key(key))
    }

    /// Number of translatable (non-metadata) keys.
    pub fn message_count(&self) -> usize {
        self.messages().count()
    }

    /// The `description` field of the `@<key>` metadata object.
    pub fn description(&self, key: &str) -> Option<&str> {
        self.0
            .get(&format!("@{}", key))
            .and_then(|meta| meta.get("description"))
            .and_then(Value::as_str)
    }
}
