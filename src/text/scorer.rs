//! Token-set similarity scoring

use serde::{Deserialize, Serialize};

use super::normalizer::TokenSet;
use crate::error::KbError;

/// Weighted components of the similarity score
///
/// Each component counts a disjoint slice of the token union: `exact`
/// weights plain token overlap, `synonym` weights tokens matched only
/// through the other side's synonym expansions, `partial` weights substring
/// matches between longer leftover tokens. With `exact` at 1.0 two
/// identical token sets score exactly 1.0.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScorerWeights {
    #[serde(default = "default_exact_weight")]
    pub exact: f64,
    #[serde(default = "default_synonym_weight")]
    pub synonym: f64,
    #[serde(default = "default_partial_weight")]
    pub partial: f64,
    /// Minimum token length for substring matching
    #[serde(default = "default_min_partial_len")]
    pub min_partial_len: usize,
}

fn default_exact_weight() -> f64 {
    1.0
}

fn default_synonym_weight() -> f64 {
    0.5
}

fn default_partial_weight() -> f64 {
    0.25
}

fn default_min_partial_len() -> usize {
    4
}

impl Default for ScorerWeights {
    fn default() -> Self {
        Self {
            exact: default_exact_weight(),
            synonym: default_synonym_weight(),
            partial: default_partial_weight(),
            min_partial_len: default_min_partial_len(),
        }
    }
}

impl ScorerWeights {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the exact-match weight
    pub fn with_exact(mut self, weight: f64) -> Self {
        self.exact = weight.clamp(0.0, 1.0);
        self
    }

    /// Set the synonym-match weight
    pub fn with_synonym(mut self, weight: f64) -> Self {
        self.synonym = weight.clamp(0.0, 1.0);
        self
    }

    /// Set the partial-match weight
    pub fn with_partial(mut self, weight: f64) -> Self {
        self.partial = weight.clamp(0.0, 1.0);
        self
    }

    /// Set the minimum token length for substring matching
    pub fn with_min_partial_len(mut self, len: usize) -> Self {
        self.min_partial_len = len;
        self
    }

    /// Validate the weight configuration
    ///
    /// Exact matches must carry the largest weight and synonym matches must
    /// outweigh partial matches, so the score stays within `[0, 1]` and the
    /// match tiers keep their intended order.
    pub fn validate(&self) -> Result<(), KbError> {
        for (name, weight) in [
            ("exact", self.exact),
            ("synonym", self.synonym),
            ("partial", self.partial),
        ] {
            if !(0.0..=1.0).contains(&weight) {
                return Err(KbError::configuration(format!(
                    "{name} weight {weight} must be between 0.0 and 1.0"
                )));
            }
        }

        if self.exact <= 0.0 {
            return Err(KbError::configuration("exact weight must be positive"));
        }

        if self.synonym > self.exact || self.partial > self.synonym {
            return Err(KbError::configuration(
                "weights must be ordered: exact >= synonym >= partial",
            ));
        }

        Ok(())
    }
}

/// Stateless similarity scorer over normalized token sets
#[derive(Debug, Clone)]
pub struct SimilarityScorer {
    weights: ScorerWeights,
}

impl SimilarityScorer {
    /// Create a scorer after validating the weights
    pub fn new(weights: ScorerWeights) -> Result<Self, KbError> {
        weights.validate()?;
        Ok(Self { weights })
    }

    pub fn weights(&self) -> &ScorerWeights {
        &self.weights
    }

    /// Score the similarity of two token sets, in `[0, 1]`
    ///
    /// Symmetric: every component counts both directions. Returns exactly
    /// 0.0 when either side has no literal tokens.
    pub fn score(&self, a: &TokenSet, b: &TokenSet) -> f64 {
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }

        let union = a.tokens().union(b.tokens()).count() as f64;
        let exact = a.tokens().intersection(b.tokens()).count() as f64;

        let a_only: Vec<&str> = a
            .tokens()
            .difference(b.tokens())
            .map(String::as_str)
            .collect();
        let b_only: Vec<&str> = b
            .tokens()
            .difference(a.tokens())
            .map(String::as_str)
            .collect();

        let a_synonym: Vec<&str> = a_only
            .iter()
            .copied()
            .filter(|token| b.expansions().contains(*token))
            .collect();
        let b_synonym: Vec<&str> = b_only
            .iter()
            .copied()
            .filter(|token| a.expansions().contains(*token))
            .collect();
        let synonym = (a_synonym.len() + b_synonym.len()) as f64;

        let min_len = self.weights.min_partial_len;
        let a_rest: Vec<&str> = a_only
            .iter()
            .copied()
            .filter(|token| !a_synonym.contains(token) && token.chars().count() >= min_len)
            .collect();
        let b_rest: Vec<&str> = b_only
            .iter()
            .copied()
            .filter(|token| !b_synonym.contains(token) && token.chars().count() >= min_len)
            .collect();

        let a_partial = a_rest
            .iter()
            .copied()
            .filter(|token| b_rest.iter().copied().any(|other| related(token, other)))
            .count();
        let b_partial = b_rest
            .iter()
            .copied()
            .filter(|token| a_rest.iter().copied().any(|other| related(token, other)))
            .count();
        let partial = (a_partial + b_partial) as f64 / 2.0;

        let weights = &self.weights;
        let raw =
            (weights.exact * exact + weights.synonym * synonym + weights.partial * partial) / union;
        raw.clamp(0.0, 1.0)
    }
}

/// Substring relation between two tokens, in either direction
fn related(a: &str, b: &str) -> bool {
    a.contains(b) || b.contains(a)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::text::{Lexicon, Normalizer, NormalizerConfig};

    const EPS: f64 = 1e-9;

    fn scorer() -> SimilarityScorer {
        SimilarityScorer::new(ScorerWeights::default()).unwrap()
    }

    fn plain(text: &str) -> TokenSet {
        Normalizer::new(NormalizerConfig::default(), Lexicon::empty()).normalize(text)
    }

    #[test]
    fn test_empty_input_scores_zero() {
        let s = scorer();
        assert_eq!(s.score(&plain(""), &plain("open van negen uur")), 0.0);
        assert_eq!(s.score(&plain("open"), &plain("")), 0.0);
        assert_eq!(s.score(&plain(""), &plain("")), 0.0);
    }

    #[test]
    fn test_identical_sets_score_one() {
        let s = scorer();
        let score = s.score(
            &plain("open van negen tot vijf"),
            &plain("open van negen tot vijf"),
        );
        assert!((score - 1.0).abs() < EPS);
    }

    #[test]
    fn test_disjoint_sets_score_zero() {
        let s = scorer();
        let score = s.score(&plain("openingstijden vandaag"), &plain("reserveren online"));
        assert!(score.abs() < EPS);
    }

    #[test]
    fn test_partial_overlap() {
        let s = scorer();
        // {open, uur, negen} vs {open, uur, tien}: 2 shared of 4 in the union
        let score = s.score(&plain("open negen uur"), &plain("open tien uur"));
        assert!((score - 0.5).abs() < EPS);
    }

    #[test]
    fn test_symmetry() {
        let lexicon = Lexicon::new(
            ["de"].iter().map(|w| w.to_string()).collect(),
            BTreeMap::from([("prijs".to_string(), vec!["kosten".to_string()])]),
        )
        .unwrap();
        let normalizer = Normalizer::new(NormalizerConfig::default(), lexicon);
        let s = scorer();

        let pairs = [
            ("wat is de prijs", "de kosten staan online"),
            ("arrangement boeken", "arrangementen bekijken"),
            ("open negen uur", "gesloten vandaag"),
        ];

        for (left, right) in pairs {
            let a = normalizer.normalize(left);
            let b = normalizer.normalize(right);
            assert!(
                (s.score(&a, &b) - s.score(&b, &a)).abs() < EPS,
                "score must be symmetric for ({left}, {right})"
            );
        }
    }

    #[test]
    fn test_synonym_bridge_outweighed_by_exact() {
        let lexicon = Lexicon::new(
            Default::default(),
            BTreeMap::from([("prijs".to_string(), vec!["kosten".to_string()])]),
        )
        .unwrap();
        let normalizer = Normalizer::new(NormalizerConfig::default(), lexicon);
        let s = scorer();

        let query = normalizer.normalize("prijs");
        let exact_doc = normalizer.normalize("prijs");
        let synonym_doc = normalizer.normalize("kosten");

        let exact_score = s.score(&query, &exact_doc);
        let synonym_score = s.score(&query, &synonym_doc);

        assert!(synonym_score > 0.0, "synonym bridge must count");
        assert!(exact_score > synonym_score, "exact match must score higher");
    }

    #[test]
    fn test_substring_match_scores_lowest() {
        let s = scorer();
        let score = s.score(&plain("arrangement"), &plain("arrangementen"));

        // One token per side, related by substring: half a hit per side
        // against a union of two, weighted 0.25.
        assert!(score > 0.0);
        assert!(score < 0.2);
    }

    #[test]
    fn test_short_tokens_skip_substring_matching() {
        let s = scorer();
        // "17" is a substring of nothing and too short for partial matching
        let score = s.score(&plain("om 17"), &plain("om 18"));
        assert!((score - 1.0 / 3.0).abs() < EPS);
    }

    #[test]
    fn test_weight_validation() {
        assert!(ScorerWeights::default().validate().is_ok());

        let zero_exact = ScorerWeights {
            exact: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            zero_exact.validate(),
            Err(KbError::Configuration { .. })
        ));

        let inverted = ScorerWeights {
            exact: 0.3,
            synonym: 0.8,
            ..Default::default()
        };
        assert!(inverted.validate().is_err());

        let out_of_range = ScorerWeights {
            partial: 1.5,
            ..Default::default()
        };
        assert!(out_of_range.validate().is_err());
    }

    #[test]
    fn test_builder_clamps() {
        let weights = ScorerWeights::new().with_synonym(2.0);
        assert_eq!(weights.synonym, 1.0);
    }
}
