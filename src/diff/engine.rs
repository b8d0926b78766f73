//! Snapshot diff engine

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::change::{ChangeKind, ChangeRecord, DiffReport, DiffSummary, FieldDiff, TrackedField};
use crate::error::KbError;
use crate::snapshot::{EntryKey, KbEntry, KbSnapshot};
use crate::text::{Normalizer, SimilarityScorer};

/// Diff engine configuration
///
/// The thresholds are policy, not algorithm: how much whitespace and
/// formatting noise an "unchanged" verdict tolerates, and how similar two
/// bodies must be before a disappeared and an appeared entry count as one
/// renamed page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffConfig {
    /// Similarity at or above which a field counts as unchanged
    #[serde(default = "default_unchanged_threshold")]
    pub unchanged_threshold: f64,
    /// Body similarity at or above which a removed/added pair is a rename
    #[serde(default = "default_rename_threshold")]
    pub rename_threshold: f64,
    /// Pair disappeared and appeared entries by body similarity
    #[serde(default = "default_true")]
    pub detect_renames: bool,
}

fn default_unchanged_threshold() -> f64 {
    0.95
}

fn default_rename_threshold() -> f64 {
    0.85
}

fn default_true() -> bool {
    true
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            unchanged_threshold: default_unchanged_threshold(),
            rename_threshold: default_rename_threshold(),
            detect_renames: default_true(),
        }
    }
}

impl DiffConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the unchanged threshold
    pub fn with_unchanged_threshold(mut self, threshold: f64) -> Self {
        self.unchanged_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Set the rename threshold
    pub fn with_rename_threshold(mut self, threshold: f64) -> Self {
        self.rename_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Enable or disable rename pairing
    pub fn with_detect_renames(mut self, detect: bool) -> Self {
        self.detect_renames = detect;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), KbError> {
        for (name, threshold) in [
            ("unchanged_threshold", self.unchanged_threshold),
            ("rename_threshold", self.rename_threshold),
        ] {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(KbError::configuration(format!(
                    "{name} {threshold} must be between 0.0 and 1.0"
                )));
            }
        }

        Ok(())
    }

    /// Classify a field similarity against the unchanged threshold
    pub fn is_unchanged(&self, similarity: f64) -> bool {
        similarity >= self.unchanged_threshold
    }
}

/// Stateless change detection between two snapshots
///
/// Compares the current KB content against a freshly scraped capture and
/// emits one change record per entry, partitioning the union of both
/// snapshots. Neither input is mutated.
#[derive(Debug, Clone)]
pub struct DiffEngine {
    normalizer: Normalizer,
    scorer: SimilarityScorer,
    config: DiffConfig,
}

impl DiffEngine {
    /// Create an engine after validating the configuration
    pub fn new(
        normalizer: Normalizer,
        scorer: SimilarityScorer,
        config: DiffConfig,
    ) -> Result<Self, KbError> {
        config.validate()?;
        Ok(Self {
            normalizer,
            scorer,
            config,
        })
    }

    pub fn config(&self) -> &DiffConfig {
        &self.config
    }

    /// Generate the ordered change list between two snapshots
    ///
    /// Records are grouped by kind in the fixed order added, removed,
    /// modified, unchanged, then sorted by key, so regenerating the diff
    /// yields byte-identical review output.
    pub fn generate_changes(
        &self,
        current: &KbSnapshot,
        scraped: &KbSnapshot,
    ) -> Result<Vec<ChangeRecord>, KbError> {
        current.validate()?;
        scraped.validate()?;

        if let (Some(current_fp), Some(scraped_fp)) = (
            current.info().fingerprint.as_deref(),
            scraped.info().fingerprint.as_deref(),
        ) {
            if current_fp == scraped_fp {
                debug!(
                    fingerprint = current_fp,
                    "content fingerprints match, skipping field comparison"
                );
                let mut changes: Vec<ChangeRecord> = current
                    .entries()
                    .iter()
                    .map(|entry| ChangeRecord::new(ChangeKind::Unchanged, entry.key().clone()))
                    .collect();
                sort_changes(&mut changes);
                return Ok(changes);
            }
        }

        let current_by_key: BTreeMap<&EntryKey, &KbEntry> = current
            .entries()
            .iter()
            .map(|entry| (entry.key(), entry))
            .collect();
        let scraped_by_key: BTreeMap<&EntryKey, &KbEntry> = scraped
            .entries()
            .iter()
            .map(|entry| (entry.key(), entry))
            .collect();

        let removed_entries: Vec<&KbEntry> = current
            .entries()
            .iter()
            .filter(|entry| !scraped_by_key.contains_key(entry.key()))
            .collect();
        let added_entries: Vec<&KbEntry> = scraped
            .entries()
            .iter()
            .filter(|entry| !current_by_key.contains_key(entry.key()))
            .collect();

        let renames = if self.config.detect_renames {
            self.pair_renames(&removed_entries, &added_entries)
        } else {
            Vec::new()
        };
        let paired_old: BTreeSet<&EntryKey> = renames.iter().map(|(old, _, _)| old.key()).collect();
        let paired_new: BTreeSet<&EntryKey> = renames.iter().map(|(_, new, _)| new.key()).collect();

        let mut changes: Vec<ChangeRecord> = Vec::new();

        for (old_entry, new_entry, body_score) in &renames {
            // The key diff carries the body similarity that justified the
            // pairing.
            let mut fields = vec![FieldDiff::new(
                TrackedField::Key,
                old_entry.key().as_str(),
                new_entry.key().as_str(),
                *body_score,
            )];
            fields.extend(self.compare_entries(old_entry, new_entry));

            changes.push(
                ChangeRecord::new(ChangeKind::Modified, new_entry.key().clone())
                    .with_renamed_from(old_entry.key().clone())
                    .with_entry((*new_entry).clone())
                    .with_fields(fields),
            );
        }

        for entry in &added_entries {
            if paired_new.contains(entry.key()) {
                continue;
            }
            changes.push(
                ChangeRecord::new(ChangeKind::Added, entry.key().clone())
                    .with_entry((*entry).clone()),
            );
        }

        for entry in &removed_entries {
            if paired_old.contains(entry.key()) {
                continue;
            }
            changes.push(
                ChangeRecord::new(ChangeKind::Removed, entry.key().clone())
                    .with_entry((*entry).clone()),
            );
        }

        for entry in current.entries() {
            let Some(new_entry) = scraped_by_key.get(entry.key()) else {
                continue;
            };

            let fields = self.compare_entries(entry, new_entry);
            if fields.is_empty() {
                changes.push(ChangeRecord::new(ChangeKind::Unchanged, entry.key().clone()));
            } else {
                changes.push(
                    ChangeRecord::new(ChangeKind::Modified, entry.key().clone())
                        .with_entry((*new_entry).clone())
                        .with_fields(fields),
                );
            }
        }

        sort_changes(&mut changes);

        let summary = DiffSummary::of(&changes);
        info!(
            total = summary.total,
            added = summary.added,
            removed = summary.removed,
            modified = summary.modified,
            unchanged = summary.unchanged,
            "generated snapshot diff"
        );

        Ok(changes)
    }

    /// Generate the diff wrapped in its summary envelope
    pub fn report(
        &self,
        current: &KbSnapshot,
        scraped: &KbSnapshot,
    ) -> Result<DiffReport, KbError> {
        Ok(DiffReport::new(self.generate_changes(current, scraped)?))
    }

    /// Field diffs for an entry present in both snapshots; empty means
    /// unchanged
    fn compare_entries(&self, old: &KbEntry, new: &KbEntry) -> Vec<FieldDiff> {
        let mut fields = Vec::new();

        for (field, old_value, new_value) in [
            (TrackedField::Title, old.title(), new.title()),
            (TrackedField::Body, old.body(), new.body()),
            (TrackedField::Category, old.category(), new.category()),
        ] {
            let similarity = self.field_similarity(old_value, new_value);
            if !self.config.is_unchanged(similarity) {
                fields.push(FieldDiff::new(field, old_value, new_value, similarity));
            }
        }

        fields
    }

    fn field_similarity(&self, old: &str, new: &str) -> f64 {
        if old == new {
            return 1.0;
        }

        let old_tokens = self.normalizer.normalize(old);
        let new_tokens = self.normalizer.normalize(new);

        // Two different raw texts that both normalize to nothing cannot be
        // ruled identical; surface them rather than silently passing.
        if old_tokens.is_empty() && new_tokens.is_empty() {
            return 0.0;
        }

        self.scorer.score(&old_tokens, &new_tokens)
    }

    /// Greedy-stable rename pairing over body similarity
    ///
    /// Candidate pairs at or above the rename threshold resolve highest
    /// score first, ties broken by lexicographic (old key, new key); each
    /// entry is consumed by at most one pairing.
    fn pair_renames<'a>(
        &self,
        removed: &[&'a KbEntry],
        added: &[&'a KbEntry],
    ) -> Vec<(&'a KbEntry, &'a KbEntry, f64)> {
        if removed.is_empty() || added.is_empty() {
            return Vec::new();
        }

        let removed_bodies: Vec<_> = removed
            .iter()
            .map(|entry| self.normalizer.normalize(entry.body()))
            .collect();
        let added_bodies: Vec<_> = added
            .iter()
            .map(|entry| self.normalizer.normalize(entry.body()))
            .collect();

        let mut candidates: Vec<(f64, usize, usize)> = Vec::new();
        for (old_index, _) in removed.iter().enumerate() {
            for (new_index, _) in added.iter().enumerate() {
                let score = self
                    .scorer
                    .score(&removed_bodies[old_index], &added_bodies[new_index]);
                if score >= self.config.rename_threshold {
                    candidates.push((score, old_index, new_index));
                }
            }
        }

        candidates.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(Ordering::Equal)
                .then_with(|| removed[a.1].key().cmp(removed[b.1].key()))
                .then_with(|| added[a.2].key().cmp(added[b.2].key()))
        });

        let mut used_old = vec![false; removed.len()];
        let mut used_new = vec![false; added.len()];
        let mut pairs = Vec::new();

        for (score, old_index, new_index) in candidates {
            if used_old[old_index] || used_new[new_index] {
                continue;
            }
            used_old[old_index] = true;
            used_new[new_index] = true;
            debug!(
                old_key = %removed[old_index].key(),
                new_key = %added[new_index].key(),
                score,
                "paired renamed entry"
            );
            pairs.push((removed[old_index], added[new_index], score));
        }

        pairs
    }
}

/// Order records by kind rank, then key
fn sort_changes(changes: &mut [ChangeRecord]) {
    changes.sort_by(|a, b| {
        a.kind
            .sort_rank()
            .cmp(&b.kind.sort_rank())
            .then_with(|| a.key.cmp(&b.key))
    });
}

/// Apply selected change records to a snapshot
///
/// Returns a new snapshot; the input is untouched. Records apply by key in
/// the order modified, added, removed, mirroring how the review flow batches
/// them. Unknown ids, missing payloads and unchanged records are skipped
/// with a warning. Capture provenance is not carried over: the result is
/// edited content, not a scrape.
pub fn apply_changes(
    current: &KbSnapshot,
    selected: &[String],
    changes: &[ChangeRecord],
) -> KbSnapshot {
    let by_id: BTreeMap<&str, &ChangeRecord> = changes
        .iter()
        .map(|change| (change.change_id.as_str(), change))
        .collect();

    let mut modified: Vec<&ChangeRecord> = Vec::new();
    let mut added: Vec<&ChangeRecord> = Vec::new();
    let mut removed: Vec<&ChangeRecord> = Vec::new();

    for change_id in selected {
        match by_id.get(change_id.as_str()) {
            None => warn!(change_id = %change_id, "change id not found, skipping"),
            Some(&change) => match change.kind {
                ChangeKind::Modified => modified.push(change),
                ChangeKind::Added => added.push(change),
                ChangeKind::Removed => removed.push(change),
                ChangeKind::Unchanged => {}
            },
        }
    }

    let mut entries: Vec<KbEntry> = current.entries().to_vec();

    for change in modified {
        let Some(entry) = &change.entry else {
            warn!(change_id = %change.change_id, "modified record without payload, skipping");
            continue;
        };
        let target = change.renamed_from.as_ref().unwrap_or(&change.key);
        match entries.iter().position(|existing| existing.key() == target) {
            Some(index) => entries[index] = entry.clone(),
            None => {
                warn!(change_id = %change.change_id, key = %target, "entry to modify not found, skipping");
            }
        }
    }

    for change in added {
        let Some(entry) = &change.entry else {
            warn!(change_id = %change.change_id, "added record without payload, skipping");
            continue;
        };
        if entries.iter().any(|existing| existing.key() == entry.key()) {
            warn!(change_id = %change.change_id, key = %entry.key(), "entry already present, skipping add");
            continue;
        }
        entries.push(entry.clone());
    }

    for change in removed {
        entries.retain(|existing| existing.key() != &change.key);
    }

    KbSnapshot::new(entries)
}
