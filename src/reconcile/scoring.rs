//! Release desirability scoring
//!
//! Scores are plain integer sums of configured weights. Privacy plays no
//! part here; whether a release may be auto-selected is decided by the
//! release reconciler.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::Release;

/// Key in `tracker_weights` used for trackers without an explicit weight
pub const DEFAULT_TRACKER_KEY: &str = "default";

/// Weights applied when scoring a release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Added when SeaDex marks the release as best
    pub is_best_weight: i64,

    /// Added for dual audio releases
    pub dual_audio_weight: i64,

    /// Per-tracker weight, with an optional `"default"` fallback
    pub tracker_weights: BTreeMap<String, i64>,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        let mut tracker_weights = BTreeMap::new();
        tracker_weights.insert(DEFAULT_TRACKER_KEY.to_string(), 0);

        Self {
            is_best_weight: 2,
            dual_audio_weight: 1,
            tracker_weights,
        }
    }
}

impl ScoringWeights {
    /// Weight for a tracker, falling back to the `"default"` key, then 0
    pub fn tracker_weight(&self, tracker: &str) -> i64 {
        self.tracker_weights
            .get(tracker)
            .or_else(|| self.tracker_weights.get(DEFAULT_TRACKER_KEY))
            .copied()
            .unwrap_or(0)
    }
}

/// Score a release under the given weights
pub fn score(release: &Release, weights: &ScoringWeights) -> i64 {
    let mut total = 0;

    if release.is_best {
        total += weights.is_best_weight;
    }
    if release.dual_audio {
        total += weights.dual_audio_weight;
    }

    total + weights.tracker_weight(&release.tracker)
}

/// Human-readable breakdown of a score, for logging
pub fn scoring_breakdown(release: &Release, weights: &ScoringWeights) -> String {
    let mut parts = Vec::new();

    if release.is_best {
        parts.push(format!("is_best: +{}", weights.is_best_weight));
    }
    if release.dual_audio {
        parts.push(format!("dual_audio: +{}", weights.dual_audio_weight));
    }

    let tracker_score = weights.tracker_weight(&release.tracker);
    if tracker_score != 0 {
        let sign = if tracker_score >= 0 { "+" } else { "" };
        parts.push(format!("tracker({}): {sign}{tracker_score}", release.tracker));
    }

    if release.is_private() {
        parts.push("private".to_string());
    }

    if parts.is_empty() {
        "no bonuses".to_string()
    } else {
        parts.join(" | ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::REDACTED_HASH;

    fn weights() -> ScoringWeights {
        let mut tracker_weights = BTreeMap::new();
        tracker_weights.insert("Nyaa".to_string(), 3);
        tracker_weights.insert("AB".to_string(), -1);
        tracker_weights.insert(DEFAULT_TRACKER_KEY.to_string(), 1);

        ScoringWeights {
            is_best_weight: 10,
            dual_audio_weight: 5,
            tracker_weights,
        }
    }

    #[test]
    fn test_score_sums_all_weights() {
        let release = Release::new("a", "h", "Nyaa", "u")
            .with_best(true)
            .with_dual_audio(true);
        assert_eq!(score(&release, &weights()), 18);
    }

    #[test]
    fn test_unknown_tracker_uses_default() {
        let release = Release::new("a", "h", "SomewhereElse", "u");
        assert_eq!(score(&release, &weights()), 1);
    }

    #[test]
    fn test_missing_default_is_zero() {
        let weights = ScoringWeights {
            is_best_weight: 2,
            dual_audio_weight: 1,
            tracker_weights: BTreeMap::new(),
        };
        let release = Release::new("a", "h", "Nyaa", "u").with_best(true);
        assert_eq!(score(&release, &weights), 2);
    }

    #[test]
    fn test_private_scores_like_public() {
        let public = Release::new("a", "abc", "AB", "u").with_best(true);
        let private = Release::new("b", REDACTED_HASH, "AB", "u").with_best(true);
        assert_eq!(score(&public, &weights()), score(&private, &weights()));
    }

    #[test]
    fn test_breakdown() {
        let release = Release::new("a", REDACTED_HASH, "AB", "u").with_best(true);
        assert_eq!(
            scoring_breakdown(&release, &weights()),
            "is_best: +10 | tracker(AB): -1 | private"
        );

        let plain = Release::new("b", "h", "Other", "u");
        let no_default = ScoringWeights {
            tracker_weights: BTreeMap::new(),
            ..weights()
        };
        assert_eq!(scoring_breakdown(&plain, &no_default), "no bonuses");
    }
}
