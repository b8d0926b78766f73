//! Snapshot collection and validation

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entry::{EntryKey, KbEntry};
use crate::error::KbError;

/// Provenance recorded with a snapshot capture
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotInfo {
    /// Content fingerprint of the whole capture, when the scraper computed one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    /// When the capture was taken
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scraped_at: Option<DateTime<Utc>>,
    /// Where the capture came from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

impl SnapshotInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the content fingerprint
    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = Some(fingerprint.into());
        self
    }

    /// Set the capture timestamp
    pub fn with_scraped_at(mut self, at: DateTime<Utc>) -> Self {
        self.scraped_at = Some(at);
        self
    }

    /// Set the source URL
    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    /// Check whether no provenance is set
    pub fn is_empty(&self) -> bool {
        self.fingerprint.is_none() && self.scraped_at.is_none() && self.source_url.is_none()
    }
}

/// An ordered capture of KB state at one point in time
///
/// Snapshots are compared, never mutated; the engines take them by shared
/// reference and validate key uniqueness before doing any work.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KbSnapshot {
    entries: Vec<KbEntry>,
    #[serde(default, skip_serializing_if = "SnapshotInfo::is_empty")]
    info: SnapshotInfo,
}

impl KbSnapshot {
    /// Create a snapshot from an ordered entry list
    pub fn new(entries: Vec<KbEntry>) -> Self {
        Self {
            entries,
            info: SnapshotInfo::default(),
        }
    }

    /// Attach capture provenance
    pub fn with_info(mut self, info: SnapshotInfo) -> Self {
        self.info = info;
        self
    }

    pub fn entries(&self) -> &[KbEntry] {
        &self.entries
    }

    pub fn info(&self) -> &SnapshotInfo {
        &self.info
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by key
    pub fn get(&self, key: &EntryKey) -> Option<&KbEntry> {
        self.entries.iter().find(|entry| entry.key() == key)
    }

    /// Enforce unique keys across the snapshot
    ///
    /// Key emptiness and format are already enforced by [`EntryKey`]
    /// construction, so duplicates are the only thing left to reject.
    pub fn validate(&self) -> Result<(), KbError> {
        let mut seen: BTreeSet<&EntryKey> = BTreeSet::new();

        for entry in &self.entries {
            if !seen.insert(entry.key()) {
                return Err(KbError::invalid_input(format!(
                    "duplicate entry key '{}'",
                    entry.key()
                )));
            }
        }

        Ok(())
    }
}
