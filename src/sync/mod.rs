//! Reconciliation pass orchestration
//!
//! A pass reads the monitored series, loads the snapshot, merges series,
//! refreshes AniList entries per series, refreshes SeaDex releases per
//! entry, submits newly selected releases and writes the snapshot back.
//!
//! Collaborator failures skip the affected item for this pass and leave its
//! known state in place. Nothing a pass does returns an error to the caller.

pub mod scheduler;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

pub use scheduler::Scheduler;

use crate::clients::{
    build_http_client, AniListClient, DownloadClient, MetadataSearch, QBittorrentClient,
    ReleaseIndex, SeadexClient, SeriesSource, SonarrClient, SubmitOutcome,
};
use crate::config::Config;
use crate::error::MonitorError;
use crate::metrics;
use crate::models::{MetadataEntry, Release, Series};
use crate::reconcile::{
    reconcile_metadata, reconcile_releases, reconcile_series, score, scoring_breakdown,
    ScoringWeights,
};
use crate::storage::SnapshotStore;
use crate::utils::rate_limit::SlidingWindowLimiter;
use crate::utils::retry::RequestDriver;

/// What started a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    Startup,
    Schedule,
    Webhook,
    Manual,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Schedule => "schedule",
            Self::Webhook => "webhook",
            Self::Manual => "manual",
        }
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters describing one finished pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassReport {
    pub pass_id: Uuid,
    pub trigger: Trigger,
    pub started_at: DateTime<Utc>,

    /// Sonarr could not be read and the known series were reused
    pub series_source_failed: bool,
    pub series_kept: usize,
    pub series_added: usize,
    pub series_removed: usize,

    /// AniList searches issued
    pub searches: usize,
    pub entries_added: usize,
    pub entries_removed: usize,

    /// SeaDex lookups issued
    pub lookups: usize,
    pub releases_discovered: usize,
    pub releases_dropped: usize,

    /// Searches or lookups that yielded nothing usable this pass
    pub skipped: usize,

    pub selections: usize,
    pub submissions_sent: usize,
    pub submissions_declined: usize,
    pub submissions_failed: usize,

    pub duration_ms: u64,

    /// Snapshot was written
    pub persisted: bool,
}

impl PassReport {
    fn new(pass_id: Uuid, trigger: Trigger) -> Self {
        Self {
            pass_id,
            trigger,
            started_at: Utc::now(),
            series_source_failed: false,
            series_kept: 0,
            series_added: 0,
            series_removed: 0,
            searches: 0,
            entries_added: 0,
            entries_removed: 0,
            lookups: 0,
            releases_discovered: 0,
            releases_dropped: 0,
            skipped: 0,
            selections: 0,
            submissions_sent: 0,
            submissions_declined: 0,
            submissions_failed: 0,
            duration_ms: 0,
            persisted: false,
        }
    }
}

/// Runs reconciliation passes against injected collaborators
pub struct SyncEngine {
    series_source: Arc<dyn SeriesSource>,
    metadata: Arc<dyn MetadataSearch>,
    releases: Arc<dyn ReleaseIndex>,
    downloader: Arc<dyn DownloadClient>,
    weights: ScoringWeights,
    store: SnapshotStore,
}

impl SyncEngine {
    pub fn new(
        series_source: Arc<dyn SeriesSource>,
        metadata: Arc<dyn MetadataSearch>,
        releases: Arc<dyn ReleaseIndex>,
        downloader: Arc<dyn DownloadClient>,
        weights: ScoringWeights,
        store: SnapshotStore,
    ) -> Self {
        Self {
            series_source,
            metadata,
            releases,
            downloader,
            weights,
            store,
        }
    }

    /// Wire up the HTTP collaborators described by `config`
    ///
    /// Each rate-limited API gets one limiter shared by every pass this
    /// engine runs.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let http = build_http_client(&config.http).context("Failed to build HTTP client")?;

        let anilist_driver = RequestDriver::new(
            "anilist",
            Arc::new(SlidingWindowLimiter::from_config(&config.anilist.rate_limit)),
            config.retry.clone(),
        );
        let seadex_driver = RequestDriver::new(
            "seadex",
            Arc::new(SlidingWindowLimiter::from_config(&config.seadex.rate_limit)),
            config.retry.clone(),
        );

        let downloader = QBittorrentClient::new(&config.qbittorrent, &config.http)
            .context("Failed to build qBittorrent client")?;

        Ok(Self::new(
            Arc::new(SonarrClient::new(http.clone(), &config.sonarr)),
            Arc::new(AniListClient::new(http.clone(), &config.anilist, anilist_driver)),
            Arc::new(SeadexClient::new(http, &config.seadex, seadex_driver)),
            Arc::new(downloader),
            config.scoring.clone(),
            SnapshotStore::new(config.storage.snapshot_path()),
        ))
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Run one full reconciliation pass
    pub async fn run_pass(&self, trigger: Trigger) -> PassReport {
        let pass_id = Uuid::new_v4();
        let span = info_span!("sync_pass", %pass_id, trigger = trigger.as_str());
        self.execute(PassReport::new(pass_id, trigger))
            .instrument(span)
            .await
    }

    async fn execute(&self, mut report: PassReport) -> PassReport {
        let started = Instant::now();
        info!("Starting sync pass");

        let observed = self.series_source.monitored_series().await;
        let known = self.store.load().await;

        let mut series = match observed {
            Some(observed) => {
                let outcome = reconcile_series(known, observed);
                report.series_kept = outcome.kept;
                report.series_added = outcome.added;
                report.series_removed = outcome.removed;
                outcome.merged
            }
            None => {
                warn!(known = known.len(), "Series source unavailable, keeping known series");
                report.series_source_failed = true;
                report.series_kept = known.len();
                known
            }
        };

        for item in series.iter_mut() {
            self.sync_series(item, &mut report).await;
        }

        match self.store.save(&series).await {
            Ok(()) => report.persisted = true,
            Err(e) => error!(
                error = %e,
                category = %e.category(),
                path = %self.store.path().display(),
                "Failed to save snapshot"
            ),
        }

        let elapsed = started.elapsed();
        report.duration_ms = elapsed.as_millis() as u64;
        metrics::record_pass(report.trigger.as_str(), elapsed.as_secs_f64(), report.selections);

        info!(
            series = series.len(),
            added = report.series_added,
            removed = report.series_removed,
            selections = report.selections,
            sent = report.submissions_sent,
            declined = report.submissions_declined,
            failed = report.submissions_failed,
            skipped = report.skipped,
            duration_ms = report.duration_ms,
            persisted = report.persisted,
            "Sync pass finished"
        );

        report
    }

    async fn sync_series(&self, series: &mut Series, report: &mut PassReport) {
        report.searches += 1;

        match self.metadata.search(&series.title).await {
            Some(found) if !found.is_empty() => {
                let known = std::mem::take(&mut series.anilist_entries);
                let outcome = reconcile_metadata(known, found);
                report.entries_added += outcome.added;
                report.entries_removed += outcome.removed;
                series.anilist_entries = outcome.merged;
            }
            Some(_) => {
                debug!(title = %series.title, "No AniList results, keeping known entries");
            }
            None => {
                report.skipped += 1;
                warn!(title = %series.title, "AniList search failed, keeping known entries");
            }
        }

        for entry in series.anilist_entries.iter_mut() {
            if entry.ignore {
                debug!(anilist_id = entry.anilist_id, title = %entry.title, "Entry ignored, skipping SeaDex");
                continue;
            }
            self.sync_entry(entry, report).await;
        }
    }

    async fn sync_entry(&self, entry: &mut MetadataEntry, report: &mut PassReport) {
        report.lookups += 1;

        let Some(found) = self.releases.releases(entry.anilist_id).await else {
            report.skipped += 1;
            warn!(anilist_id = entry.anilist_id, "SeaDex lookup failed, keeping known releases");
            return;
        };

        let known = std::mem::take(&mut entry.torrents);
        let merge = reconcile_releases(known, found, &self.weights);
        report.releases_discovered += merge.discovered;
        report.releases_dropped += merge.dropped;
        entry.torrents = merge.releases;

        if let Some(release) = merge.selected {
            report.selections += 1;
            info!(
                anilist_id = entry.anilist_id,
                id = %release.id,
                score = score(&release, &self.weights),
                breakdown = %scoring_breakdown(&release, &self.weights),
                candidates = merge.candidates,
                "Selected new best release"
            );
            self.submit(&release, report).await;
        }
    }

    async fn submit(&self, release: &Release, report: &mut PassReport) {
        let outcome = match self.downloader.submit(release).await {
            Ok(SubmitOutcome::Sent) => {
                report.submissions_sent += 1;
                SubmitOutcome::Sent.as_str()
            }
            Ok(SubmitOutcome::Declined) => {
                report.submissions_declined += 1;
                SubmitOutcome::Declined.as_str()
            }
            Err(e) => {
                report.submissions_failed += 1;
                error!(
                    id = %release.id,
                    error = %e,
                    recoverable = e.is_recoverable(),
                    "Failed to submit release"
                );
                "failed"
            }
        };
        metrics::record_submission(outcome);
    }
}
