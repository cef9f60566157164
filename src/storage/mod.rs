//! Persistence of the known series tree
//!
//! - [`document`] - explicit mapping to and from a JSON document
//! - [`snapshot`] - file store with empty fallback and atomic overwrite

pub mod document;
pub mod snapshot;

pub use document::{series_from_document, series_to_document};
pub use snapshot::SnapshotStore;
