//! Shared text normalization and similarity scoring

mod lexicon;
mod normalizer;
mod scorer;

pub use lexicon::Lexicon;
pub use normalizer::{Normalizer, NormalizerConfig, TokenSet};
pub use scorer::{ScorerWeights, SimilarityScorer};
