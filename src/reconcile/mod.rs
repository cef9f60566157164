//! Three-way merge and selection policy for the persisted catalog
//!
//! - [`series`] - Sonarr series against the known catalog
//! - [`metadata`] - AniList search results against a series' known entries
//! - [`release`] - SeaDex releases against an entry's known releases, plus
//!   best-release selection
//! - [`scoring`] - release desirability score
//!
//! Every function here is pure apart from logging: known state and fresh
//! observations go in, the new state comes out.

pub mod metadata;
pub mod release;
pub mod scoring;
pub mod series;

pub use metadata::reconcile_metadata;
pub use release::{reconcile_releases, ReleaseMerge};
pub use scoring::{score, scoring_breakdown, ScoringWeights};
pub use series::reconcile_series;

/// Result of a keyed merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome<T> {
    /// Merged items to persist
    pub merged: Vec<T>,

    /// Known items retained
    pub kept: usize,

    /// Observed items added
    pub added: usize,

    /// Known items dropped
    pub removed: usize,
}

impl<T> Default for MergeOutcome<T> {
    fn default() -> Self {
        Self {
            merged: Vec::new(),
            kept: 0,
            added: 0,
            removed: 0,
        }
    }
}
