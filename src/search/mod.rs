//! KB search engine and query signals

mod engine;
mod signals;

pub use engine::{EmptyQueryPolicy, SearchConfig, SearchEngine, SearchResult};
pub use signals::{QueryAnalyzer, QuerySignals};
