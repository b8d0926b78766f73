//! KB diff service - change detection between snapshots

mod change;
mod engine;

pub use change::{ChangeKind, ChangeRecord, DiffReport, DiffSummary, FieldDiff, TrackedField};
pub use engine::{apply_changes, DiffConfig, DiffEngine};
