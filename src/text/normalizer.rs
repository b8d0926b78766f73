//! Text normalization into token sets

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use super::lexicon::Lexicon;

/// Normalizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// Fold Latin diacritics onto their base letters (café -> cafe)
    #[serde(default = "default_true")]
    pub fold_diacritics: bool,
    /// Drop tokens shorter than this many characters
    #[serde(default = "default_min_token_chars")]
    pub min_token_chars: usize,
}

fn default_true() -> bool {
    true
}

fn default_min_token_chars() -> usize {
    2
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            fold_diacritics: default_true(),
            min_token_chars: default_min_token_chars(),
        }
    }
}

impl NormalizerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set diacritic folding
    pub fn with_fold_diacritics(mut self, fold: bool) -> Self {
        self.fold_diacritics = fold;
        self
    }

    /// Set the minimum token length
    pub fn with_min_token_chars(mut self, min: usize) -> Self {
        self.min_token_chars = min;
        self
    }
}

/// Normalized, deduplicated tokens derived from one text field
///
/// `tokens` holds the words literally present after normalization;
/// `expansions` holds synonym alternatives that were not. Ephemeral:
/// recomputed per call, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenSet {
    tokens: BTreeSet<String>,
    expansions: BTreeSet<String>,
}

impl TokenSet {
    /// True when no literal tokens survived normalization
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }

    /// Literal normalized tokens, in lexicographic order
    pub fn tokens(&self) -> &BTreeSet<String> {
        &self.tokens
    }

    /// Synonym alternatives not literally present in the text
    pub fn expansions(&self) -> &BTreeSet<String> {
        &self.expansions
    }

    /// Merge another token set into this one (e.g. conversation context
    /// blended into a query)
    pub(crate) fn merge(&mut self, other: TokenSet) {
        let Self { tokens, expansions } = self;
        tokens.extend(other.tokens);
        expansions.extend(other.expansions);
        expansions.retain(|token| !tokens.contains(token));
    }
}

/// Shared tokenizer for both engines
///
/// Deterministic: the same text with the same config and lexicon always
/// yields the same token set.
#[derive(Debug, Clone)]
pub struct Normalizer {
    config: NormalizerConfig,
    lexicon: Lexicon,
}

impl Normalizer {
    pub fn new(config: NormalizerConfig, lexicon: Lexicon) -> Self {
        Self { config, lexicon }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// Normalize a text field into a token set
    ///
    /// Lowercases, splits on word boundaries (dropping punctuation), folds
    /// diacritics when configured, removes short tokens and stopwords, and
    /// records synonym alternatives for every surviving token. Empty or
    /// whitespace-only text yields an empty set, not an error.
    pub fn normalize(&self, text: &str) -> TokenSet {
        let mut tokens = BTreeSet::new();

        for word in text.unicode_words() {
            let mut token = word.to_lowercase();
            if self.config.fold_diacritics {
                token = fold_diacritics(&token);
            }
            if token.chars().count() < self.config.min_token_chars {
                continue;
            }
            if self.lexicon.is_stopword(&token) {
                continue;
            }
            tokens.insert(token);
        }

        let mut expansions = BTreeSet::new();
        for token in &tokens {
            if let Some(alternatives) = self.lexicon.expansions(token) {
                for alternative in alternatives {
                    if !tokens.contains(alternative) {
                        expansions.insert(alternative.clone());
                    }
                }
            }
        }

        TokenSet { tokens, expansions }
    }
}

/// Fold common Latin diacritics onto their base letters
fn fold_diacritics(token: &str) -> String {
    token
        .chars()
        .map(|c| match c {
            'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
            'è' | 'é' | 'ê' | 'ë' => 'e',
            'ì' | 'í' | 'î' | 'ï' => 'i',
            'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
            'ù' | 'ú' | 'û' | 'ü' => 'u',
            'ý' | 'ÿ' => 'y',
            'ç' => 'c',
            'ñ' => 'n',
            _ => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn dutch_lexicon() -> Lexicon {
        Lexicon::new(
            ["de", "het", "een", "van", "we", "zijn", "welke", "hebben", "jullie"]
                .iter()
                .map(|w| w.to_string())
                .collect(),
            BTreeMap::from([(
                "prijs".to_string(),
                vec!["kosten".to_string(), "tarief".to_string()],
            )]),
        )
        .unwrap()
    }

    fn normalizer() -> Normalizer {
        Normalizer::new(NormalizerConfig::default(), dutch_lexicon())
    }

    #[test]
    fn test_empty_text_yields_empty_set() {
        let n = normalizer();
        assert!(n.normalize("").is_empty());
        assert!(n.normalize("   \n\t ").is_empty());
    }

    #[test]
    fn test_punctuation_and_case() {
        let n = normalizer();
        let tokens = n.normalize("Wat is de PRIJS, alsjeblieft?");

        assert!(tokens.contains("prijs"));
        assert!(tokens.contains("wat"));
        assert!(tokens.contains("alsjeblieft"));
        assert!(!tokens.contains("de"), "stopword removed");
        assert!(!tokens.contains("prijs,"), "punctuation stripped");
    }

    #[test]
    fn test_synonyms_land_in_expansions() {
        let n = normalizer();
        let tokens = n.normalize("wat is de prijs");

        assert!(tokens.contains("prijs"));
        assert!(!tokens.contains("kosten"));
        assert!(tokens.expansions().contains("kosten"));
        assert!(tokens.expansions().contains("tarief"));
    }

    #[test]
    fn test_literal_token_not_duplicated_as_expansion() {
        let n = normalizer();
        let tokens = n.normalize("prijs en kosten");

        assert!(tokens.contains("kosten"));
        assert!(
            !tokens.expansions().contains("kosten"),
            "literal token wins over expansion"
        );
    }

    #[test]
    fn test_diacritic_folding() {
        let n = normalizer();
        let tokens = n.normalize("café ideeën");
        assert!(tokens.contains("cafe"));
        assert!(tokens.contains("ideeen"));

        let keep = Normalizer::new(
            NormalizerConfig::new().with_fold_diacritics(false),
            Lexicon::empty(),
        );
        assert!(keep.normalize("café").contains("café"));
    }

    #[test]
    fn test_short_tokens_dropped() {
        let n = normalizer();
        let tokens = n.normalize("open om 9 uur");
        assert!(!tokens.contains("9"));
        assert!(tokens.contains("om"));
        assert!(tokens.contains("uur"));
    }

    #[test]
    fn test_deterministic() {
        let n = normalizer();
        let a = n.normalize("Openingstijden: we zijn open van 9 tot 17 uur.");
        let b = n.normalize("Openingstijden: we zijn open van 9 tot 17 uur.");
        assert_eq!(a, b);
    }

    #[test]
    fn test_merge_keeps_literal_tokens_dominant() {
        let n = normalizer();
        let mut query = n.normalize("wat is de prijs");
        let context = n.normalize("de kosten van het arrangement");

        query.merge(context);

        assert!(query.contains("kosten"));
        assert!(
            !query.expansions().contains("kosten"),
            "merged literal removes the expansion"
        );
        assert!(query.contains("arrangement"));
    }

    #[test]
    fn test_config_serde_defaults() {
        let config: NormalizerConfig = serde_json::from_str("{}").unwrap();
        assert!(config.fold_diacritics);
        assert_eq!(config.min_token_chars, 2);
    }

    #[test]
    fn test_empty_lexicon_keeps_everything() {
        let n = Normalizer::new(NormalizerConfig::default(), Lexicon::empty());
        let tokens = n.normalize("de prijs van het arrangement");
        assert!(tokens.contains("de"));
        assert_eq!(tokens.expansions().len(), 0);
    }
}
