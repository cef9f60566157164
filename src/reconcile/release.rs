//! Release merge and best-release selection for one metadata entry
//!
//! The merge keeps every known release that SeaDex still lists or that was
//! chosen before the pass, resets `chosen`, and appends new releases.
//! Candidates for selection are the previously chosen releases (private or
//! not) followed by newly discovered public releases, in that order. The
//! first candidate with the highest score wins.
//!
//! When the winner was already chosen, its flag is restored and no
//! selection is reported, so an unchanged pick never triggers a second
//! download.

use std::collections::HashSet;

use tracing::{debug, info};

use super::scoring::{score, scoring_breakdown, ScoringWeights};
use crate::models::Release;

/// Result of merging and selecting releases for one metadata entry
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReleaseMerge {
    /// Newly selected release that should be submitted for download
    pub selected: Option<Release>,

    /// Merged release list to persist
    pub releases: Vec<Release>,

    /// Releases seen for the first time in this pass
    pub discovered: usize,

    /// Known releases dropped because SeaDex no longer lists them
    pub dropped: usize,

    /// Number of releases eligible for selection
    pub candidates: usize,
}

impl ReleaseMerge {
    /// The release flagged as chosen in the merged list
    pub fn chosen(&self) -> Option<&Release> {
        self.releases.iter().find(|release| release.chosen)
    }
}

/// Merge known releases with freshly discovered ones and pick the best
pub fn reconcile_releases(
    known: Vec<Release>,
    found: Vec<Release>,
    weights: &ScoringWeights,
) -> ReleaseMerge {
    let found_ids: HashSet<String> = found.iter().map(|r| r.id.clone()).collect();
    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut previously_chosen: HashSet<String> = HashSet::new();
    let mut outcome = ReleaseMerge::default();
    // Indices into `outcome.releases`, known candidates first
    let mut candidates: Vec<usize> = Vec::new();

    for mut release in known {
        if !seen_ids.insert(release.id.clone()) {
            continue;
        }

        let was_chosen = release.chosen;
        if was_chosen {
            previously_chosen.insert(release.id.clone());
        }

        if found_ids.contains(&release.id) || was_chosen {
            release.chosen = false;
            if was_chosen {
                candidates.push(outcome.releases.len());
            }
            outcome.releases.push(release);
        } else {
            debug!(release_id = %release.id, "Removing torrent no longer found and not chosen");
            outcome.dropped += 1;
        }
    }

    for mut release in found {
        if !seen_ids.insert(release.id.clone()) {
            continue;
        }

        release.chosen = false;
        outcome.discovered += 1;

        if release.is_private() {
            info!(release_id = %release.id, tracker = %release.tracker, "Skipping torrent from private tracker");
        } else {
            debug!(release_id = %release.id, "Added new torrent");
            candidates.push(outcome.releases.len());
        }
        outcome.releases.push(release);
    }

    outcome.candidates = candidates.len();

    let mut best: Option<(usize, i64)> = None;
    for index in candidates {
        let candidate_score = score(&outcome.releases[index], weights);
        match best {
            Some((_, best_score)) if candidate_score <= best_score => {}
            _ => best = Some((index, candidate_score)),
        }
    }

    let Some((best_index, best_score)) = best else {
        debug!("No candidate torrents available for best selection");
        return outcome;
    };

    let winner = &mut outcome.releases[best_index];
    winner.chosen = true;

    if previously_chosen.contains(&winner.id) {
        info!(
            release_id = %winner.id,
            score = best_score,
            breakdown = %scoring_breakdown(winner, weights),
            "Best torrent was already chosen, no redownload needed"
        );
        return outcome;
    }

    info!(
        release_id = %winner.id,
        score = best_score,
        candidates = outcome.candidates,
        breakdown = %scoring_breakdown(winner, weights),
        "Selected best torrent"
    );
    outcome.selected = Some(winner.clone());
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::REDACTED_HASH;
    use std::collections::BTreeMap;

    fn weights() -> ScoringWeights {
        let mut tracker_weights = BTreeMap::new();
        tracker_weights.insert("X".to_string(), 1);
        tracker_weights.insert("Y".to_string(), 3);
        tracker_weights.insert("default".to_string(), 0);
        ScoringWeights {
            is_best_weight: 2,
            dual_audio_weight: 1,
            tracker_weights,
        }
    }

    fn release(id: &str, tracker: &str) -> Release {
        Release::new(id, format!("hash-{id}"), tracker, format!("https://nyaa.si/view/{id}"))
    }

    fn chosen_ids(releases: &[Release]) -> Vec<&str> {
        releases.iter().filter(|r| r.chosen).map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_first_pass_selects_highest_score() {
        let found = vec![release("a", "X"), release("b", "Y")];

        let merge = reconcile_releases(Vec::new(), found, &weights());

        assert_eq!(merge.selected.as_ref().map(|r| r.id.as_str()), Some("b"));
        assert_eq!(chosen_ids(&merge.releases), vec!["b"]);
        assert_eq!(merge.discovered, 2);
    }

    #[test]
    fn test_tie_prefers_known_chosen() {
        let known = vec![release("a", "X").with_best(true).with_chosen(true)];
        let found = vec![release("a", "X").with_best(true), release("b", "Y")];

        let merge = reconcile_releases(known, found, &weights());

        assert!(merge.selected.is_none());
        assert_eq!(chosen_ids(&merge.releases), vec!["a"]);
        assert_eq!(merge.releases.len(), 2);
    }

    #[test]
    fn test_tie_between_new_releases_uses_discovery_order() {
        let found = vec![release("first", "Z"), release("second", "Z")];
        let merge = reconcile_releases(Vec::new(), found, &weights());
        assert_eq!(merge.selected.map(|r| r.id), Some("first".to_string()));
    }

    #[test]
    fn test_better_new_release_replaces_chosen() {
        let known = vec![release("a", "X").with_chosen(true)];
        let found = vec![release("a", "X"), release("b", "Y")];

        let merge = reconcile_releases(known, found, &weights());

        assert_eq!(merge.selected.as_ref().map(|r| r.id.as_str()), Some("b"));
        assert_eq!(chosen_ids(&merge.releases), vec!["b"]);
    }

    #[test]
    fn test_known_unchosen_release_is_not_a_candidate() {
        let known = vec![release("a", "Y")];
        let found = vec![release("a", "Y")];

        let merge = reconcile_releases(known, found, &weights());

        assert!(merge.selected.is_none());
        assert!(chosen_ids(&merge.releases).is_empty());
        assert_eq!(merge.candidates, 0);
    }

    #[test]
    fn test_chosen_release_kept_when_no_longer_listed() {
        let known = vec![release("a", "X").with_chosen(true), release("stale", "X")];

        let merge = reconcile_releases(known, Vec::new(), &weights());

        assert_eq!(merge.releases.len(), 1);
        assert_eq!(chosen_ids(&merge.releases), vec!["a"]);
        assert_eq!(merge.dropped, 1);
        assert!(merge.selected.is_none());
    }

    #[test]
    fn test_new_private_release_never_selected() {
        let private = Release::new("p", REDACTED_HASH, "Y", "https://animebytes.tv/t/1").with_best(true);
        let found = vec![private, release("a", "X")];

        let merge = reconcile_releases(Vec::new(), found, &weights());

        assert_eq!(merge.selected.map(|r| r.id), Some("a".to_string()));
    }

    #[test]
    fn test_only_private_releases_selects_nothing() {
        let private = Release::new("p", REDACTED_HASH, "Y", "https://animebytes.tv/t/1");

        let merge = reconcile_releases(Vec::new(), vec![private], &weights());

        assert!(merge.selected.is_none());
        assert_eq!(merge.releases.len(), 1);
        assert!(chosen_ids(&merge.releases).is_empty());
    }

    #[test]
    fn test_chosen_private_release_can_be_reconfirmed() {
        let private = Release::new("p", REDACTED_HASH, "Y", "https://animebytes.tv/t/1")
            .with_best(true)
            .with_chosen(true);
        let found = vec![private.clone().with_chosen(false), release("a", "X")];

        let merge = reconcile_releases(vec![private], found, &weights());

        assert!(merge.selected.is_none());
        assert_eq!(chosen_ids(&merge.releases), vec!["p"]);
    }

    #[test]
    fn test_idempotent_second_pass() {
        let found = vec![release("a", "X"), release("b", "Y")];
        let first = reconcile_releases(Vec::new(), found.clone(), &weights());
        let second = reconcile_releases(first.releases.clone(), found, &weights());

        assert!(second.selected.is_none());
        assert_eq!(second.releases, first.releases);
    }
}
