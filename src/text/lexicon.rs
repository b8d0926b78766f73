//! Stopword and synonym data supplied by the caller

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::KbError;

/// Read-only stopword set and synonym map shared by both engines
///
/// The crate ships no word lists of its own; callers load them from their
/// configuration and pass the lexicon in at construction time. All lookups
/// are lowercase; input words are normalized on construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lexicon {
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    stopwords: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    synonyms: BTreeMap<String, BTreeSet<String>>,
}

impl Lexicon {
    /// A pass-through lexicon: no stopwords, no synonyms
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a lexicon after validating the supplied word lists
    pub fn new(
        stopwords: BTreeSet<String>,
        synonyms: BTreeMap<String, Vec<String>>,
    ) -> Result<Self, KbError> {
        let mut normalized_stopwords = BTreeSet::new();

        for word in stopwords {
            let word = word.trim().to_lowercase();
            if word.is_empty() {
                return Err(KbError::configuration("stopword list contains an empty word"));
            }
            normalized_stopwords.insert(word);
        }

        let mut normalized_synonyms = BTreeMap::new();

        for (word, alternatives) in synonyms {
            let word = word.trim().to_lowercase();
            if word.is_empty() {
                return Err(KbError::configuration("synonym map contains an empty key"));
            }

            let mut normalized_alternatives = BTreeSet::new();
            for alternative in alternatives {
                let alternative = alternative.trim().to_lowercase();
                if alternative.is_empty() {
                    return Err(KbError::configuration(format!(
                        "synonym list for '{word}' contains an empty word"
                    )));
                }
                if alternative != word {
                    normalized_alternatives.insert(alternative);
                }
            }

            if !normalized_alternatives.is_empty() {
                normalized_synonyms.insert(word, normalized_alternatives);
            }
        }

        Ok(Self {
            stopwords: normalized_stopwords,
            synonyms: normalized_synonyms,
        })
    }

    /// Check whether a normalized token is a stopword
    pub fn is_stopword(&self, token: &str) -> bool {
        self.stopwords.contains(token)
    }

    /// Synonym alternatives for a normalized token, if any
    pub fn expansions(&self, token: &str) -> Option<&BTreeSet<String>> {
        self.synonyms.get(token)
    }

    pub fn stopword_count(&self) -> usize {
        self.stopwords.len()
    }

    pub fn synonym_count(&self) -> usize {
        self.synonyms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_lookups_are_lowercase() {
        let lexicon = Lexicon::new(
            words(&["De", "HET"]),
            BTreeMap::from([("Prijs".to_string(), vec!["Kosten".to_string()])]),
        )
        .unwrap();

        assert!(lexicon.is_stopword("de"));
        assert!(lexicon.is_stopword("het"));
        assert!(!lexicon.is_stopword("prijs"));

        let expansions = lexicon.expansions("prijs").unwrap();
        assert!(expansions.contains("kosten"));
    }

    #[test]
    fn test_self_synonyms_are_dropped() {
        let lexicon = Lexicon::new(
            BTreeSet::new(),
            BTreeMap::from([(
                "prijs".to_string(),
                vec!["prijs".to_string(), "kosten".to_string()],
            )]),
        )
        .unwrap();

        let expansions = lexicon.expansions("prijs").unwrap();
        assert_eq!(expansions.len(), 1);
        assert!(expansions.contains("kosten"));
    }

    #[test]
    fn test_empty_words_rejected() {
        assert!(matches!(
            Lexicon::new(words(&["de", "  "]), BTreeMap::new()),
            Err(KbError::Configuration { .. })
        ));

        assert!(Lexicon::new(
            BTreeSet::new(),
            BTreeMap::from([("".to_string(), vec!["kosten".to_string()])]),
        )
        .is_err());

        assert!(Lexicon::new(
            BTreeSet::new(),
            BTreeMap::from([("prijs".to_string(), vec![" ".to_string()])]),
        )
        .is_err());
    }

    #[test]
    fn test_empty_lexicon_passes_everything() {
        let lexicon = Lexicon::empty();
        assert!(!lexicon.is_stopword("de"));
        assert!(lexicon.expansions("prijs").is_none());
    }
}
