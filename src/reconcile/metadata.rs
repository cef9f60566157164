//! Metadata-entry merge for a single series

use std::collections::HashSet;

use tracing::{debug, info};

use super::MergeOutcome;
use crate::models::MetadataEntry;

/// Merge known AniList entries with fresh search results
///
/// Entries still found are kept unmodified. Entries missing from the search
/// are kept only when `manually_added` or `ignore` is set. New entries are
/// appended, and the result is stably sorted by season year so ties keep
/// kept-then-added order.
pub fn reconcile_metadata(
    known: Vec<MetadataEntry>,
    found: Vec<MetadataEntry>,
) -> MergeOutcome<MetadataEntry> {
    let found_ids: HashSet<i64> = found.iter().map(|e| e.anilist_id).collect();
    let mut known_ids = HashSet::new();
    let mut outcome = MergeOutcome::default();

    for entry in known {
        if !known_ids.insert(entry.anilist_id) {
            continue;
        }

        if found_ids.contains(&entry.anilist_id) {
            debug!(title = %entry.title, anilist_id = entry.anilist_id, "Keeping existing AniList entry");
            outcome.kept += 1;
            outcome.merged.push(entry);
        } else if entry.is_protected() {
            debug!(
                title = %entry.title,
                anilist_id = entry.anilist_id,
                manually_added = entry.manually_added,
                ignore = entry.ignore,
                "Keeping manually added/ignored entry"
            );
            outcome.kept += 1;
            outcome.merged.push(entry);
        } else {
            info!(
                title = %entry.title,
                anilist_id = entry.anilist_id,
                "Removing AniList entry no longer found in search"
            );
            outcome.removed += 1;
        }
    }

    for entry in found {
        if known_ids.insert(entry.anilist_id) {
            info!(title = %entry.title, anilist_id = entry.anilist_id, "Added new AniList entry");
            outcome.added += 1;
            outcome.merged.push(entry);
        }
    }

    outcome.merged.sort_by_key(|entry| entry.season_year);
    outcome
}
