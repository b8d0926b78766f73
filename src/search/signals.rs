//! Query signal detection

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Signals that bias ranking for one search call
///
/// Assembled directly by the caller or derived from the query text via
/// [`QueryAnalyzer`]. Purely additive hints: an empty signal set leaves the
/// ranking untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuerySignals {
    /// Categories detected in (or asserted for) the query
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub categories: BTreeSet<String>,
    /// Prior conversation context blended into the query tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Reference instant for the recency boost
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_time: Option<DateTime<Utc>>,
}

impl QuerySignals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assert a category signal
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.categories.insert(category.into().to_lowercase());
        self
    }

    /// Attach conversation context
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Set the reference instant for recency boosting
    pub fn with_reference_time(mut self, at: DateTime<Utc>) -> Self {
        self.reference_time = Some(at);
        self
    }

    /// Check whether a category signal is set
    pub fn has_category(&self, category: &str) -> bool {
        self.categories.contains(&category.to_lowercase())
    }
}

/// Detects signal categories from caller-supplied keyword groups
///
/// Each group maps a category name to the phrases that indicate it. A
/// category fires when any of its phrases occurs in the lowercased query,
/// so multi-word phrases and word stems both work ("kinderfeestje" matches
/// the phrase "kinder").
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryAnalyzer {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    groups: BTreeMap<String, BTreeSet<String>>,
}

impl QueryAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a keyword group for one category
    pub fn with_group(
        mut self,
        category: impl Into<String>,
        phrases: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let phrases = phrases
            .into_iter()
            .map(|phrase| phrase.into().to_lowercase())
            .filter(|phrase| !phrase.trim().is_empty())
            .collect::<BTreeSet<_>>();

        if !phrases.is_empty() {
            self.groups.insert(category.into().to_lowercase(), phrases);
        }
        self
    }

    /// Derive signals from a free-text query
    pub fn analyze(&self, query: &str) -> QuerySignals {
        let query = query.to_lowercase();
        let mut signals = QuerySignals::new();

        for (category, phrases) in &self.groups {
            if phrases.iter().any(|phrase| query.contains(phrase.as_str())) {
                signals.categories.insert(category.clone());
            }
        }

        signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzer() -> QueryAnalyzer {
        QueryAnalyzer::new()
            .with_group("kids", ["kind", "kinder", "verjaardag"])
            .with_group("pricing", ["prijs", "kosten", "euro"])
            .with_group("arrangement", ["arrangement", "pakket", "deal"])
    }

    #[test]
    fn test_detects_multiple_signals() {
        let signals = analyzer().analyze("Wat kost een kinderfeestje arrangement?");

        assert!(signals.has_category("kids"), "stem 'kinder' matches");
        assert!(signals.has_category("arrangement"));
        assert!(!signals.has_category("pricing"), "'kost' is not 'kosten'");
    }

    #[test]
    fn test_no_signals_for_unrelated_query() {
        let signals = analyzer().analyze("hoe laat zijn jullie open");
        assert!(signals.categories.is_empty());
    }

    #[test]
    fn test_case_insensitive() {
        let signals = analyzer().analyze("PRIJS van het ARRANGEMENT");
        assert!(signals.has_category("pricing"));
        assert!(signals.has_category("arrangement"));
    }

    #[test]
    fn test_manual_signal_assembly() {
        let signals = QuerySignals::new()
            .with_category("Kids")
            .with_context("we hadden het over kinderfeestjes");

        assert!(signals.has_category("kids"));
        assert_eq!(
            signals.context.as_deref(),
            Some("we hadden het over kinderfeestjes")
        );
    }

    #[test]
    fn test_empty_phrases_are_dropped() {
        let analyzer = QueryAnalyzer::new().with_group("blank", ["", "  "]);
        let signals = analyzer.analyze("anything");
        assert!(signals.categories.is_empty());
    }
}
