//! KB content comparison and retrieval engines
//!
//! Shared core for the scrape-review and assistant applications:
//!
//! - **Diff**: compare the current KB snapshot against a freshly scraped
//!   capture and emit structured, reviewable change records
//! - **Search**: rank KB entries against a free-text query using token
//!   overlap, synonym bridging and query signals
//!
//! Both engines are pure, synchronous functions of their inputs: no I/O,
//! no shared mutable state, safe to call concurrently on independent data.
//! Stopword and synonym lists are supplied by the caller as a [`Lexicon`];
//! the crate ships none of its own.

pub mod diff;
pub mod error;
pub mod search;
pub mod snapshot;
pub mod text;

pub use diff::{
    apply_changes, ChangeKind, ChangeRecord, DiffConfig, DiffEngine, DiffReport, DiffSummary,
    FieldDiff, TrackedField,
};
pub use error::KbError;
pub use search::{
    EmptyQueryPolicy, QueryAnalyzer, QuerySignals, SearchConfig, SearchEngine, SearchResult,
};
pub use snapshot::{EntryKey, EntryMetadata, KbEntry, KbSnapshot, SnapshotInfo};
pub use text::{Lexicon, Normalizer, NormalizerConfig, ScorerWeights, SimilarityScorer, TokenSet};
