//! KB entry types

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::validate_entry_key;
use crate::error::KbError;

/// Entry identity key - a source URL or slug, unique within a snapshot
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntryKey(String);

impl EntryKey {
    /// Create a new EntryKey after validation
    pub fn new(key: impl Into<String>) -> Result<Self, KbError> {
        let key = key.into();
        validate_entry_key(&key)?;
        Ok(Self(key))
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for EntryKey {
    type Error = KbError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EntryKey> for String {
    fn from(key: EntryKey) -> Self {
        key.0
    }
}

impl std::fmt::Display for EntryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Optional metadata carried alongside an entry's title and body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// Content category (e.g. "faq", "arrangement")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// When the source content last changed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    /// Open key-value metadata, carried through but not diffed
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra: HashMap<String, serde_json::Value>,
}

impl EntryMetadata {
    /// Check whether no metadata is set
    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.last_modified.is_none() && self.extra.is_empty()
    }
}

/// A single knowledge unit within a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KbEntry {
    key: EntryKey,
    title: String,
    body: String,
    #[serde(default, skip_serializing_if = "EntryMetadata::is_empty")]
    metadata: EntryMetadata,
}

impl KbEntry {
    /// Create a new entry
    pub fn new(key: EntryKey, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            key,
            title: title.into(),
            body: body.into(),
            metadata: EntryMetadata::default(),
        }
    }

    /// Set the content category
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.metadata.category = Some(category.into());
        self
    }

    /// Set the last-modified timestamp
    pub fn with_last_modified(mut self, at: DateTime<Utc>) -> Self {
        self.metadata.last_modified = Some(at);
        self
    }

    /// Add open metadata
    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.extra.insert(key.into(), value);
        self
    }

    /// Replace all metadata
    pub fn with_metadata(mut self, metadata: EntryMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn key(&self) -> &EntryKey {
        &self.key
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn metadata(&self) -> &EntryMetadata {
        &self.metadata
    }

    /// Category as a plain string, empty when unset
    pub fn category(&self) -> &str {
        self.metadata.category.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_key_valid() {
        let key = EntryKey::new("faq-1").unwrap();
        assert_eq!(key.as_str(), "faq-1");
        assert_eq!(key.to_string(), "faq-1");
    }

    #[test]
    fn test_entry_key_invalid() {
        assert!(EntryKey::new("").is_err());
        assert!(EntryKey::new("faq 1").is_err());
    }

    #[test]
    fn test_entry_key_serde_round_trip() {
        let key = EntryKey::new("faq-1").unwrap();
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"faq-1\"");

        let back: EntryKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);

        let bad: Result<EntryKey, _> = serde_json::from_str("\"\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_entry_builder() {
        let entry = KbEntry::new(
            EntryKey::new("faq-1").unwrap(),
            "Openingstijden",
            "We zijn open van 9 tot 17 uur.",
        )
        .with_category("faq")
        .with_extra("source", serde_json::json!("https://example.nl/faq"));

        assert_eq!(entry.key().as_str(), "faq-1");
        assert_eq!(entry.title(), "Openingstijden");
        assert_eq!(entry.category(), "faq");
        assert_eq!(
            entry.metadata().extra.get("source"),
            Some(&serde_json::json!("https://example.nl/faq"))
        );
    }

    #[test]
    fn test_category_defaults_to_empty() {
        let entry = KbEntry::new(EntryKey::new("a").unwrap(), "Titel", "Tekst");
        assert_eq!(entry.category(), "");
        assert!(entry.metadata().is_empty());
    }
}
