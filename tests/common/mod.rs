//! Common test utilities
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use seadex_monitor::clients::{
    DownloadClient, MetadataSearch, ReleaseIndex, SeriesSource, SubmitOutcome,
};
use seadex_monitor::models::{MetadataEntry, Release, Series, REDACTED_HASH};
use seadex_monitor::reconcile::ScoringWeights;
use seadex_monitor::storage::SnapshotStore;
use seadex_monitor::sync::SyncEngine;
use seadex_monitor::utils::error::DownloadError;
use tempfile::TempDir;

/// Public release with a hash derived from its id
pub fn release(id: &str, tracker: &str) -> Release {
    Release::new(
        id,
        format!("hash-{id}"),
        tracker,
        format!("https://releases.example/{id}"),
    )
}

/// Private release with a redacted hash
pub fn private_release(id: &str, tracker: &str) -> Release {
    Release::new(id, REDACTED_HASH, tracker, format!("https://private.example/{id}"))
}

/// Weights used by the documented tie scenario
pub fn scenario_weights() -> ScoringWeights {
    let mut weights = ScoringWeights::default();
    weights.tracker_weights.insert("X".to_string(), 1);
    weights.tracker_weights.insert("Y".to_string(), 3);
    weights
}

/// Series with one metadata entry
pub fn series_with_entry(sonarr_id: i64, title: &str, entry: MetadataEntry) -> Series {
    let mut series = Series::new(sonarr_id, title, 1);
    series.anilist_entries.push(entry);
    series
}

/// Series source returning a fixed answer
#[derive(Default)]
pub struct FakeSeriesSource {
    pub series: Mutex<Option<Vec<Series>>>,
    pub calls: AtomicUsize,
}

impl FakeSeriesSource {
    pub fn new(series: Option<Vec<Series>>) -> Self {
        Self {
            series: Mutex::new(series),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set(&self, series: Option<Vec<Series>>) {
        *self.series.lock().unwrap() = series;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SeriesSource for FakeSeriesSource {
    async fn monitored_series(&self) -> Option<Vec<Series>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.series.lock().unwrap().clone()
    }
}

/// Metadata search answering by title; unknown titles fail
#[derive(Default)]
pub struct FakeMetadataSearch {
    pub results: Mutex<HashMap<String, Option<Vec<MetadataEntry>>>>,
    pub calls: AtomicUsize,
}

impl FakeMetadataSearch {
    pub fn set(&self, title: &str, result: Option<Vec<MetadataEntry>>) {
        self.results.lock().unwrap().insert(title.to_string(), result);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataSearch for FakeMetadataSearch {
    async fn search(&self, title: &str) -> Option<Vec<MetadataEntry>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.results.lock().unwrap().get(title).cloned().flatten()
    }
}

/// Release index answering by AniList id; unknown ids fail
#[derive(Default)]
pub struct FakeReleaseIndex {
    pub results: Mutex<HashMap<i64, Option<Vec<Release>>>>,
    pub lookups: Mutex<Vec<i64>>,
}

impl FakeReleaseIndex {
    pub fn set(&self, anilist_id: i64, result: Option<Vec<Release>>) {
        self.results.lock().unwrap().insert(anilist_id, result);
    }

    pub fn lookups(&self) -> Vec<i64> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReleaseIndex for FakeReleaseIndex {
    async fn releases(&self, anilist_id: i64) -> Option<Vec<Release>> {
        self.lookups.lock().unwrap().push(anilist_id);
        self.results.lock().unwrap().get(&anilist_id).cloned().flatten()
    }
}

/// Download client that records submissions
#[derive(Default)]
pub struct RecordingDownloader {
    pub submitted: Mutex<Vec<Release>>,
    pub fail: bool,
}

impl RecordingDownloader {
    pub fn failing() -> Self {
        Self {
            submitted: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn submitted_ids(&self) -> Vec<String> {
        self.submitted
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.id.clone())
            .collect()
    }
}

#[async_trait]
impl DownloadClient for RecordingDownloader {
    async fn submit(&self, release: &Release) -> Result<SubmitOutcome, DownloadError> {
        self.submitted.lock().unwrap().push(release.clone());

        if release.is_private() {
            return Ok(SubmitOutcome::Declined);
        }
        if self.fail {
            return Err(DownloadError::Auth("Fails.".to_string()));
        }
        Ok(SubmitOutcome::Sent)
    }
}

/// Engine wired to fakes and a snapshot in a temp directory
pub struct Harness {
    pub sonarr: Arc<FakeSeriesSource>,
    pub anilist: Arc<FakeMetadataSearch>,
    pub seadex: Arc<FakeReleaseIndex>,
    pub downloader: Arc<RecordingDownloader>,
    pub store: SnapshotStore,
    pub dir: TempDir,
}

impl Harness {
    pub fn new(series: Option<Vec<Series>>) -> Self {
        Self::with_downloader(series, RecordingDownloader::default())
    }

    pub fn with_downloader(series: Option<Vec<Series>>, downloader: RecordingDownloader) -> Self {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path().join("known_series.json"));

        Self {
            sonarr: Arc::new(FakeSeriesSource::new(series)),
            anilist: Arc::new(FakeMetadataSearch::default()),
            seadex: Arc::new(FakeReleaseIndex::default()),
            downloader: Arc::new(downloader),
            store,
            dir,
        }
    }

    pub fn engine(&self, weights: ScoringWeights) -> SyncEngine {
        SyncEngine::new(
            self.sonarr.clone(),
            self.anilist.clone(),
            self.seadex.clone(),
            self.downloader.clone(),
            weights,
            self.store.clone(),
        )
    }
}
