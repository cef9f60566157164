//! SeaDex release index
//!
//! A lookup is two-staged: the collection entries for an AniList id list
//! release record ids (`trs`), and every record is then fetched on its own.
//! Both stages share one rate limiter. A lookup only succeeds when every
//! stage could be fetched.

use std::collections::HashSet;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{check_status, ReleaseIndex};
use crate::config::SeadexConfig;
use crate::models::Release;
use crate::utils::error::FetchError;
use crate::utils::retry::RequestDriver;

#[derive(Debug, Default, Deserialize)]
struct RecordList {
    #[serde(default)]
    items: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct EntryPayload {
    #[serde(default)]
    trs: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct TorrentPayload {
    info_hash: String,
    tracker: String,
    url: String,
    is_best: bool,
    dual_audio: bool,
}

/// Record ids are interpolated into a filter expression, so only plain
/// alphanumeric ids are accepted
pub fn is_valid_record_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Release record ids across all entries, in order, without duplicates
///
/// Ids that are not plain alphanumeric are dropped.
pub fn release_ids_from_entries(items: Vec<Value>) -> Vec<String> {
    let mut seen = HashSet::new();

    items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<EntryPayload>(item).ok())
        .flat_map(|entry| entry.trs)
        .filter(|id| {
            if is_valid_record_id(id) {
                true
            } else {
                warn!(id = %id, "Skipping SeaDex release with malformed id");
                false
            }
        })
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

/// Map one torrent record to a [`Release`]
///
/// Returns `None` when the record has no info hash or no URL.
pub fn release_from_record(id: &str, record: Value) -> Option<Release> {
    let payload: TorrentPayload = serde_json::from_value(record).ok()?;

    if payload.info_hash.is_empty() || payload.url.is_empty() {
        debug!(id, "Skipping release with missing info hash or url");
        return None;
    }

    let release = Release::new(id, payload.info_hash, payload.tracker, payload.url)
        .with_best(payload.is_best)
        .with_dual_audio(payload.dual_audio);

    debug!(
        id,
        tracker = %release.tracker,
        is_best = release.is_best,
        dual_audio = release.dual_audio,
        private = release.is_private(),
        "Found release"
    );
    Some(release)
}

/// SeaDex API client
pub struct SeadexClient {
    client: Client,
    entries_url: String,
    torrents_url: String,
    driver: RequestDriver,
}

impl SeadexClient {
    pub fn new(client: Client, config: &SeadexConfig, driver: RequestDriver) -> Self {
        Self {
            client,
            entries_url: config.entries_url.clone(),
            torrents_url: config.torrents_url.clone(),
            driver,
        }
    }

    async fn list(&self, url: &str, filter: &str) -> Result<Vec<Value>, FetchError> {
        let response = self
            .client
            .get(url)
            .query(&[("filter", filter)])
            .send()
            .await
            .map_err(FetchError::from_transport)?;

        let list: RecordList = check_status(response)?
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?;

        Ok(list.items)
    }

    /// Records matching one release id, or `None` when the fetch failed
    async fn release_records(&self, id: &str) -> Option<Vec<Value>> {
        let filter = format!("(id='{id}')");
        self.driver
            .execute(id, || self.list(&self.torrents_url, &filter))
            .await
    }
}

#[async_trait]
impl ReleaseIndex for SeadexClient {
    async fn releases(&self, anilist_id: i64) -> Option<Vec<Release>> {
        let filter = format!("(alID={anilist_id})");
        let label = anilist_id.to_string();

        let entries = self
            .driver
            .execute(&label, || self.list(&self.entries_url, &filter))
            .await;

        let Some(entries) = entries else {
            warn!(anilist_id, "Failed to fetch SeaDex entries");
            return None;
        };

        let ids = release_ids_from_entries(entries);
        if ids.is_empty() {
            debug!(anilist_id, "No SeaDex releases listed");
            return Some(Vec::new());
        }

        // A failed fetch fails the whole lookup; missing or incomplete
        // records are dropped
        let mut releases = Vec::with_capacity(ids.len());
        for id in &ids {
            let Some(records) = self.release_records(id).await else {
                warn!(anilist_id, id = %id, "Failed to fetch SeaDex release, skipping entry this pass");
                return None;
            };

            match records.into_iter().next() {
                Some(record) => releases.extend(release_from_record(id, record)),
                None => debug!(id = %id, "Release record not found"),
            }
        }

        info!(anilist_id, listed = ids.len(), valid = releases.len(), "Fetched SeaDex releases");
        Some(releases)
    }
}
