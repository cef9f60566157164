//! AniList metadata search over GraphQL

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::{check_status, MetadataSearch};
use crate::config::AniListConfig;
use crate::models::MetadataEntry;
use crate::utils::error::FetchError;
use crate::utils::retry::RequestDriver;

const SEARCH_QUERY: &str = r#"
query ($search: String, $perPage: Int) {
  Page(perPage: $perPage) {
    media(search: $search, type: ANIME) {
      id
      title {
        romaji
        english
        native
      }
      format
      episodes
      seasonYear
    }
  }
}
"#;

/// Media formats that map onto Sonarr seasons
pub const ACCEPTED_FORMATS: [&str; 4] = ["TV", "TV_SHORT", "ONA", "OVA"];

const UNKNOWN_TITLE: &str = "Unknown Title";

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    data: Option<SearchData>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchData {
    #[serde(rename = "Page")]
    page: Option<PagePayload>,
}

#[derive(Debug, Default, Deserialize)]
struct PagePayload {
    #[serde(default)]
    media: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MediaPayload {
    id: Option<i64>,
    #[serde(default)]
    title: MediaTitle,
    format: Option<String>,
    season_year: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
struct MediaTitle {
    english: Option<String>,
    romaji: Option<String>,
    native: Option<String>,
}

impl MediaTitle {
    /// English, then romaji, then native
    fn preferred(self) -> String {
        [self.english, self.romaji, self.native]
            .into_iter()
            .flatten()
            .find(|title| !title.is_empty())
            .unwrap_or_else(|| UNKNOWN_TITLE.to_string())
    }
}

/// Map raw AniList media items to metadata entries sorted by season year
///
/// Items without an id or season year, or with a format outside
/// [`ACCEPTED_FORMATS`], are dropped. Items with equal years keep the
/// order AniList returned them in.
pub fn entries_from_media(items: Vec<Value>) -> Vec<MetadataEntry> {
    let mut entries: Vec<MetadataEntry> = items
        .into_iter()
        .filter_map(|item| {
            let media: MediaPayload = serde_json::from_value(item).ok()?;
            let anilist_id = media.id.filter(|id| *id != 0)?;
            let season_year = media.season_year.filter(|year| *year != 0)?;

            let format = media.format.unwrap_or_default();
            if !ACCEPTED_FORMATS.contains(&format.as_str()) {
                debug!(anilist_id, format = %format, "Skipping AniList entry with unsupported format");
                return None;
            }

            let title = media.title.preferred();
            debug!(title = %title, anilist_id, season_year, "Found AniList entry");
            Some(MetadataEntry::new(anilist_id, title, season_year))
        })
        .collect();

    entries.sort_by_key(|entry| entry.season_year);
    entries
}

/// AniList GraphQL client
pub struct AniListClient {
    client: Client,
    url: String,
    per_page: u32,
    driver: RequestDriver,
}

impl AniListClient {
    pub fn new(client: Client, config: &AniListConfig, driver: RequestDriver) -> Self {
        Self {
            client,
            url: config.url.clone(),
            per_page: config.per_page,
            driver,
        }
    }

    async fn query(&self, title: &str) -> Result<Vec<Value>, FetchError> {
        let body = json!({
            "query": SEARCH_QUERY,
            "variables": { "search": title, "perPage": self.per_page },
        });

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(FetchError::from_transport)?;

        let payload: SearchResponse = check_status(response)?
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?;

        Ok(payload
            .data
            .and_then(|data| data.page)
            .map(|page| page.media)
            .unwrap_or_default())
    }
}

#[async_trait]
impl MetadataSearch for AniListClient {
    async fn search(&self, title: &str) -> Option<Vec<MetadataEntry>> {
        let media = self.driver.execute(title, || self.query(title)).await?;
        let entries = entries_from_media(media);

        if entries.is_empty() {
            info!(title, "No AniList results found");
        } else {
            debug!(title, count = entries.len(), "AniList search finished");
        }
        Some(entries)
    }
}
