//! Stateless KB search engine

use std::cmp::Ordering;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;

use super::signals::QuerySignals;
use crate::error::KbError;
use crate::snapshot::{EntryKey, KbEntry, KbSnapshot};
use crate::text::{Normalizer, SimilarityScorer};

/// Behavior for empty or whitespace-only queries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyQueryPolicy {
    /// Return no results
    #[default]
    ReturnNone,
    /// Return every entry in snapshot order with a zero score
    AllEntries,
}

/// Search engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Weight of the title score relative to the body score
    #[serde(default = "default_title_weight")]
    pub title_weight: f64,
    /// Weight of the body score
    #[serde(default = "default_body_weight")]
    pub body_weight: f64,
    /// Results scoring at or below this are excluded
    #[serde(default)]
    pub min_score: f64,
    /// Result cap; unbounded when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// What to return for an empty or whitespace-only query
    #[serde(default)]
    pub empty_query_policy: EmptyQueryPolicy,
    /// Additive boost when the entry category matches a signal category
    #[serde(default = "default_category_boost")]
    pub category_boost: f64,
    /// Additive boost for recently modified entries
    #[serde(default = "default_recency_boost")]
    pub recency_boost: f64,
    /// How far back from the signal reference time the recency boost reaches
    #[serde(default = "default_recency_window_days")]
    pub recency_window_days: i64,
    /// Excerpt length in characters; 0 disables excerpts
    #[serde(default = "default_excerpt_chars")]
    pub excerpt_chars: usize,
}

fn default_title_weight() -> f64 {
    2.0
}

fn default_body_weight() -> f64 {
    1.0
}

fn default_category_boost() -> f64 {
    0.15
}

fn default_recency_boost() -> f64 {
    0.05
}

fn default_recency_window_days() -> i64 {
    30
}

fn default_excerpt_chars() -> usize {
    240
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            title_weight: default_title_weight(),
            body_weight: default_body_weight(),
            min_score: 0.0,
            limit: None,
            empty_query_policy: EmptyQueryPolicy::default(),
            category_boost: default_category_boost(),
            recency_boost: default_recency_boost(),
            recency_window_days: default_recency_window_days(),
            excerpt_chars: default_excerpt_chars(),
        }
    }
}

impl SearchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the title weight
    pub fn with_title_weight(mut self, weight: f64) -> Self {
        self.title_weight = weight;
        self
    }

    /// Set the body weight
    pub fn with_body_weight(mut self, weight: f64) -> Self {
        self.body_weight = weight;
        self
    }

    /// Set the minimum relevance threshold
    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = min_score.clamp(0.0, 1.0);
        self
    }

    /// Cap the result set size
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the empty-query policy
    pub fn with_empty_query_policy(mut self, policy: EmptyQueryPolicy) -> Self {
        self.empty_query_policy = policy;
        self
    }

    /// Set the category boost
    pub fn with_category_boost(mut self, boost: f64) -> Self {
        self.category_boost = boost.clamp(0.0, 1.0);
        self
    }

    /// Set the recency boost
    pub fn with_recency_boost(mut self, boost: f64) -> Self {
        self.recency_boost = boost.clamp(0.0, 1.0);
        self
    }

    /// Set the recency window in days
    pub fn with_recency_window_days(mut self, days: i64) -> Self {
        self.recency_window_days = days.max(0);
        self
    }

    /// Set the excerpt length; 0 disables excerpts
    pub fn with_excerpt_chars(mut self, chars: usize) -> Self {
        self.excerpt_chars = chars;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), KbError> {
        if self.title_weight < 0.0 || self.body_weight < 0.0 {
            return Err(KbError::configuration(
                "title and body weights must not be negative",
            ));
        }
        if self.title_weight + self.body_weight <= 0.0 {
            return Err(KbError::configuration(
                "title and body weights must not both be zero",
            ));
        }
        if !(0.0..=1.0).contains(&self.min_score) {
            return Err(KbError::configuration(format!(
                "min_score {} must be between 0.0 and 1.0",
                self.min_score
            )));
        }
        for (name, boost) in [
            ("category_boost", self.category_boost),
            ("recency_boost", self.recency_boost),
        ] {
            if !(0.0..=1.0).contains(&boost) {
                return Err(KbError::configuration(format!(
                    "{name} {boost} must be between 0.0 and 1.0"
                )));
            }
        }
        if self.recency_window_days < 0 {
            return Err(KbError::configuration(
                "recency_window_days must not be negative",
            ));
        }

        Ok(())
    }
}

/// A ranked entry reference with its explainability payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Key of the matched entry
    pub key: EntryKey,
    /// Relevance score in `[0, 1]`
    pub score: f64,
    /// Query tokens that matched the entry
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matched_terms: Vec<String>,
    /// Body excerpt around the first match
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
}

/// Stateless search over a snapshot
///
/// Purely a function of its inputs: no call mutates the snapshot or retains
/// state, so one engine can serve many threads.
#[derive(Debug, Clone)]
pub struct SearchEngine {
    normalizer: Normalizer,
    scorer: SimilarityScorer,
    config: SearchConfig,
}

impl SearchEngine {
    /// Create an engine after validating the configuration
    pub fn new(
        normalizer: Normalizer,
        scorer: SimilarityScorer,
        config: SearchConfig,
    ) -> Result<Self, KbError> {
        config.validate()?;
        Ok(Self {
            normalizer,
            scorer,
            config,
        })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Rank the snapshot's entries against a free-text query
    ///
    /// Results come back sorted by descending score, ties broken by the
    /// entry's position in the snapshot, so repeated calls over the same
    /// input produce identical output.
    pub fn search(
        &self,
        snapshot: &KbSnapshot,
        query: &str,
        signals: Option<&QuerySignals>,
    ) -> Result<Vec<SearchResult>, KbError> {
        snapshot.validate()?;

        if snapshot.is_empty() {
            debug!("searching an empty snapshot, returning no results");
            return Ok(Vec::new());
        }

        if query.trim().is_empty() {
            return Ok(self.empty_query_results(snapshot));
        }

        let mut query_tokens = self.normalizer.normalize(query);
        if let Some(context) = signals.and_then(|signals| signals.context.as_deref()) {
            query_tokens.merge(self.normalizer.normalize(context));
        }

        let mut scored: Vec<(usize, SearchResult)> = Vec::new();

        for (index, entry) in snapshot.entries().iter().enumerate() {
            let title_tokens = self.normalizer.normalize(entry.title());
            let body_tokens = self.normalizer.normalize(entry.body());

            let title_score = self.scorer.score(&query_tokens, &title_tokens);
            let body_score = self.scorer.score(&query_tokens, &body_tokens);

            let mut score = (self.config.title_weight * title_score
                + self.config.body_weight * body_score)
                / (self.config.title_weight + self.config.body_weight);

            // Boosts refine relevance; they never resurrect a zero match.
            if score > 0.0 {
                if let Some(signals) = signals {
                    score = (score + self.signal_boost(entry, signals)).clamp(0.0, 1.0);
                }
            }

            if score <= self.config.min_score {
                continue;
            }

            let matched_terms = matched_terms(&query_tokens, &title_tokens, &body_tokens);
            let excerpt = self.make_excerpt(entry.body(), &matched_terms);

            scored.push((
                index,
                SearchResult {
                    key: entry.key().clone(),
                    score,
                    matched_terms,
                    excerpt,
                },
            ));
        }

        scored.sort_by(|a, b| {
            b.1.score
                .partial_cmp(&a.1.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });

        let mut results: Vec<SearchResult> = scored.into_iter().map(|(_, result)| result).collect();
        if let Some(limit) = self.config.limit {
            results.truncate(limit);
        }

        debug!(results = results.len(), "search ranked snapshot entries");
        Ok(results)
    }

    fn empty_query_results(&self, snapshot: &KbSnapshot) -> Vec<SearchResult> {
        match self.config.empty_query_policy {
            EmptyQueryPolicy::ReturnNone => Vec::new(),
            EmptyQueryPolicy::AllEntries => {
                let mut results: Vec<SearchResult> = snapshot
                    .entries()
                    .iter()
                    .map(|entry| SearchResult {
                        key: entry.key().clone(),
                        score: 0.0,
                        matched_terms: Vec::new(),
                        excerpt: None,
                    })
                    .collect();
                if let Some(limit) = self.config.limit {
                    results.truncate(limit);
                }
                results
            }
        }
    }

    fn signal_boost(&self, entry: &KbEntry, signals: &QuerySignals) -> f64 {
        let mut boost = 0.0;

        let category = entry.category();
        if !category.is_empty() && signals.has_category(category) {
            debug!(key = %entry.key(), category, "category signal boost");
            boost += self.config.category_boost;
        }

        if let (Some(reference), Some(modified)) =
            (signals.reference_time, entry.metadata().last_modified)
        {
            let age = reference.signed_duration_since(modified);
            if age >= Duration::zero() && age <= Duration::days(self.config.recency_window_days) {
                debug!(key = %entry.key(), "recency signal boost");
                boost += self.config.recency_boost;
            }
        }

        boost
    }

    /// Sentence-trimmed window of the body around the first matched term
    fn make_excerpt(&self, body: &str, matched_terms: &[String]) -> Option<String> {
        let max_chars = self.config.excerpt_chars;
        if max_chars == 0 || matched_terms.is_empty() {
            return None;
        }

        let sentences: Vec<&str> = body
            .unicode_sentences()
            .map(str::trim)
            .filter(|sentence| !sentence.is_empty())
            .collect();

        let hit = sentences.iter().position(|sentence| {
            let sentence = sentence.to_lowercase();
            matched_terms
                .iter()
                .any(|term| sentence.contains(term.as_str()))
        })?;

        let mut excerpt = String::new();
        let mut end = hit;
        for sentence in &sentences[hit..] {
            if !excerpt.is_empty() && excerpt.len() + sentence.len() + 1 > max_chars {
                break;
            }
            if !excerpt.is_empty() {
                excerpt.push(' ');
            }
            excerpt.push_str(sentence);
            end += 1;
            if excerpt.len() >= max_chars {
                break;
            }
        }

        if hit > 0 {
            excerpt.insert_str(0, "...");
        }
        if end < sentences.len() {
            excerpt.push_str("...");
        }

        Some(excerpt)
    }
}

/// Query tokens that matched the entry, literally or through expansions
fn matched_terms(
    query: &crate::text::TokenSet,
    title: &crate::text::TokenSet,
    body: &crate::text::TokenSet,
) -> Vec<String> {
    let mut matched = std::collections::BTreeSet::new();

    for token in query.tokens() {
        if title.contains(token)
            || body.contains(token)
            || title.expansions().contains(token)
            || body.expansions().contains(token)
        {
            matched.insert(token.clone());
        }
    }

    for token in query.expansions() {
        if title.contains(token) || body.contains(token) {
            matched.insert(token.clone());
        }
    }

    matched.into_iter().collect()
}
