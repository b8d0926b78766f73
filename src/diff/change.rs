//! Change records and diff summaries

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::snapshot::{EntryKey, KbEntry};

/// Classification of one entry across two snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
    Unchanged,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Modified => "modified",
            Self::Unchanged => "unchanged",
        }
    }

    /// Fixed review ordering: added, removed, modified, unchanged
    pub(crate) fn sort_rank(self) -> u8 {
        match self {
            Self::Added => 0,
            Self::Removed => 1,
            Self::Modified => 2,
            Self::Unchanged => 3,
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Entry fields compared by the diff engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackedField {
    Key,
    Title,
    Body,
    Category,
}

impl TrackedField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Key => "key",
            Self::Title => "title",
            Self::Body => "body",
            Self::Category => "category",
        }
    }
}

impl std::fmt::Display for TrackedField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One field-level difference on a modified entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDiff {
    pub field: TrackedField,
    /// Raw field text from the current snapshot
    pub old_value: String,
    /// Raw field text from the scraped snapshot
    pub new_value: String,
    /// Normalized similarity between the two values, in `[0, 1]`
    pub similarity: f64,
}

impl FieldDiff {
    pub fn new(
        field: TrackedField,
        old_value: impl Into<String>,
        new_value: impl Into<String>,
        similarity: f64,
    ) -> Self {
        Self {
            field,
            old_value: old_value.into(),
            new_value: new_value.into(),
            similarity,
        }
    }
}

/// One detected difference between two snapshots
///
/// Self-contained for review tooling: `entry` carries the scraped payload
/// for added and modified records and the removed payload for removed
/// records, so a reviewer can apply the change without the source snapshots
/// at hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Deterministic identifier derived from the kind and key
    pub change_id: String,
    pub kind: ChangeKind,
    /// Key of the affected entry (the new key for renames)
    pub key: EntryKey,
    /// Previous key when a rename was detected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renamed_from: Option<EntryKey>,
    /// Entry payload; absent for unchanged records
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<KbEntry>,
    /// Field-level diffs; only populated on modified records
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldDiff>,
}

impl ChangeRecord {
    /// Create a record with its deterministic change id
    pub(crate) fn new(kind: ChangeKind, key: EntryKey) -> Self {
        let change_id = change_id(kind, &key);
        Self {
            change_id,
            kind,
            key,
            renamed_from: None,
            entry: None,
            fields: Vec::new(),
        }
    }

    pub(crate) fn with_entry(mut self, entry: KbEntry) -> Self {
        self.entry = Some(entry);
        self
    }

    pub(crate) fn with_renamed_from(mut self, key: EntryKey) -> Self {
        self.renamed_from = Some(key);
        self
    }

    pub(crate) fn with_fields(mut self, fields: Vec<FieldDiff>) -> Self {
        self.fields = fields;
        self
    }
}

/// Derive a stable change id from the kind and entry key
///
/// Content-addressed so re-running the diff over the same snapshots yields
/// the same ids, letting a reviewer's selection survive a regeneration.
fn change_id(kind: ChangeKind, key: &EntryKey) -> String {
    let digest = Sha256::digest(format!("{}:{}", kind.as_str(), key).as_bytes());
    format!("{}_{}", kind.as_str(), &hex::encode(digest)[..12])
}

/// Counts per change kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub total: usize,
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
    pub unchanged: usize,
}

impl DiffSummary {
    /// Tally a change list
    pub fn of(changes: &[ChangeRecord]) -> Self {
        let mut summary = Self::default();

        for change in changes {
            summary.total += 1;
            match change.kind {
                ChangeKind::Added => summary.added += 1,
                ChangeKind::Removed => summary.removed += 1,
                ChangeKind::Modified => summary.modified += 1,
                ChangeKind::Unchanged => summary.unchanged += 1,
            }
        }

        summary
    }
}

/// Diff envelope shipped to review tooling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffReport {
    pub summary: DiffSummary,
    pub changes: Vec<ChangeRecord>,
}

impl DiffReport {
    pub fn new(changes: Vec<ChangeRecord>) -> Self {
        Self {
            summary: DiffSummary::of(&changes),
            changes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(value: &str) -> EntryKey {
        EntryKey::new(value).unwrap()
    }

    #[test]
    fn test_change_id_is_deterministic() {
        let a = ChangeRecord::new(ChangeKind::Added, key("faq-1"));
        let b = ChangeRecord::new(ChangeKind::Added, key("faq-1"));
        assert_eq!(a.change_id, b.change_id);
        assert!(a.change_id.starts_with("added_"));
        assert_eq!(a.change_id.len(), "added_".len() + 12);
    }

    #[test]
    fn test_change_id_varies_by_kind_and_key() {
        let added = ChangeRecord::new(ChangeKind::Added, key("faq-1"));
        let removed = ChangeRecord::new(ChangeKind::Removed, key("faq-1"));
        let other = ChangeRecord::new(ChangeKind::Added, key("faq-2"));

        assert_ne!(added.change_id, removed.change_id);
        assert_ne!(added.change_id, other.change_id);
    }

    #[test]
    fn test_summary_counts() {
        let changes = vec![
            ChangeRecord::new(ChangeKind::Added, key("a")),
            ChangeRecord::new(ChangeKind::Removed, key("b")),
            ChangeRecord::new(ChangeKind::Modified, key("c")),
            ChangeRecord::new(ChangeKind::Unchanged, key("d")),
            ChangeRecord::new(ChangeKind::Unchanged, key("e")),
        ];

        let summary = DiffSummary::of(&changes);
        assert_eq!(summary.total, 5);
        assert_eq!(summary.added, 1);
        assert_eq!(summary.removed, 1);
        assert_eq!(summary.modified, 1);
        assert_eq!(summary.unchanged, 2);
    }

    #[test]
    fn test_kind_serde_names() {
        assert_eq!(
            serde_json::to_string(&ChangeKind::Modified).unwrap(),
            "\"modified\""
        );
        assert_eq!(
            serde_json::to_string(&TrackedField::Body).unwrap(),
            "\"body\""
        );
    }

    #[test]
    fn test_report_round_trip() {
        let changes = vec![ChangeRecord::new(ChangeKind::Added, key("faq-1"))];
        let report = DiffReport::new(changes);

        let json = serde_json::to_string(&report).unwrap();
        let back: DiffReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
        assert_eq!(back.summary.added, 1);
    }
}
