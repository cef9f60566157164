//! Sonarr series source
//!
//! Reads `GET /api/v3/series` once per pass. Sonarr is a local service, so
//! there is no rate limiting and no retry: a failed read yields `None` and
//! the engine keeps its known series for that pass.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{check_status, SeriesSource};
use crate::config::SonarrConfig;
use crate::models::Series;
use crate::utils::error::FetchError;
use crate::utils::join_url;

const SERIES_PATH: &str = "api/v3/series";
const API_KEY_HEADER: &str = "X-Api-Key";
const ANIME_SERIES_TYPE: &str = "anime";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeriesPayload {
    id: Option<i64>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    monitored: bool,
    #[serde(default)]
    series_type: String,
    #[serde(default)]
    tags: Vec<i64>,
    #[serde(default)]
    seasons: Vec<SeasonPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeasonPayload {
    #[serde(default)]
    season_number: i64,
}

/// Which monitored series to keep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeriesFilter {
    /// Keep only series whose type is `anime`
    pub anime_only: bool,
    /// Keep only series carrying one of these tags (empty keeps all)
    pub tags: Vec<i64>,
}

impl SeriesFilter {
    fn accepts(&self, payload: &SeriesPayload) -> bool {
        if !payload.monitored {
            return false;
        }
        if self.anime_only && !payload.series_type.eq_ignore_ascii_case(ANIME_SERIES_TYPE) {
            return false;
        }
        self.tags.is_empty() || payload.tags.iter().any(|tag| self.tags.contains(tag))
    }
}

/// Map raw Sonarr series items to [`Series`]
///
/// Items that fail to decode or lack an id are dropped individually.
pub fn series_from_payload(items: Vec<Value>, filter: &SeriesFilter) -> Vec<Series> {
    let mut series = Vec::new();

    for item in items {
        let payload: SeriesPayload = match serde_json::from_value(item) {
            Ok(payload) => payload,
            Err(e) => {
                debug!(error = %e, "Skipping undecodable Sonarr series");
                continue;
            }
        };

        if !filter.accepts(&payload) {
            continue;
        }

        let Some(sonarr_id) = payload.id else {
            debug!(title = %payload.title, "Skipping Sonarr series without id");
            continue;
        };

        let num_seasons = payload
            .seasons
            .iter()
            .filter(|season| season.season_number > 0)
            .count() as u32;

        series.push(Series::new(sonarr_id, payload.title, num_seasons));
    }

    series
}

/// Sonarr API client
pub struct SonarrClient {
    client: Client,
    base_url: String,
    api_key: String,
    filter: SeriesFilter,
}

impl SonarrClient {
    pub fn new(client: Client, config: &SonarrConfig) -> Self {
        Self {
            client,
            base_url: config.url.clone(),
            api_key: config.api_key.clone(),
            filter: SeriesFilter {
                anime_only: config.anime_only,
                tags: config.tags.clone(),
            },
        }
    }

    async fn fetch(&self) -> Result<Vec<Value>, FetchError> {
        let url = join_url(&self.base_url, SERIES_PATH);
        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(FetchError::from_transport)?;

        check_status(response)?
            .json::<Vec<Value>>()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))
    }
}

#[async_trait]
impl SeriesSource for SonarrClient {
    async fn monitored_series(&self) -> Option<Vec<Series>> {
        match self.fetch().await {
            Ok(items) => {
                let total = items.len();
                let series = series_from_payload(items, &self.filter);
                info!(total, monitored = series.len(), "Fetched series from Sonarr");
                Some(series)
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch series from Sonarr");
                None
            }
        }
    }
}
