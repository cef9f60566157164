//! Series-level merge of the persisted catalog against Sonarr

use std::collections::HashSet;

use tracing::{debug, info};

use super::MergeOutcome;
use crate::models::Series;

/// Merge known series with the series currently monitored in Sonarr
///
/// Known series still monitored are kept as they are (their title and
/// season count are not refreshed), new ones are appended, and series no
/// longer monitored are dropped. There is no protection flag at this level:
/// a series that is briefly unmonitored loses its entries and releases.
pub fn reconcile_series(known: Vec<Series>, observed: Vec<Series>) -> MergeOutcome<Series> {
    let observed_ids: HashSet<i64> = observed.iter().map(|s| s.sonarr_id).collect();
    let mut known_ids = HashSet::new();
    let mut outcome = MergeOutcome::default();

    for series in known {
        if !known_ids.insert(series.sonarr_id) {
            debug!(sonarr_id = series.sonarr_id, "Duplicate known series ignored");
            continue;
        }

        if observed_ids.contains(&series.sonarr_id) {
            debug!(title = %series.title, sonarr_id = series.sonarr_id, "Keeping existing series");
            outcome.kept += 1;
            outcome.merged.push(series);
        } else {
            info!(
                title = %series.title,
                sonarr_id = series.sonarr_id,
                "Removed series (no longer monitored)"
            );
            outcome.removed += 1;
        }
    }

    for series in observed {
        if known_ids.insert(series.sonarr_id) {
            info!(title = %series.title, sonarr_id = series.sonarr_id, "Added new series");
            outcome.added += 1;
            outcome.merged.push(series);
        }
    }

    outcome
}
