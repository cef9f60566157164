//! External collaborators
//!
//! Each collaborator is reached through a trait so the sync engine can be
//! driven by fakes in tests. The HTTP implementations report "no data this
//! pass" as `None` and never surface errors to the engine, except for the
//! download client whose outcome is logged and counted per submission.

pub mod anilist;
pub mod qbittorrent;
pub mod seadex;
pub mod sonarr;

use async_trait::async_trait;
use reqwest::{Client, Response};

pub use anilist::AniListClient;
pub use qbittorrent::QBittorrentClient;
pub use seadex::SeadexClient;
pub use sonarr::SonarrClient;

use crate::config::HttpConfig;
use crate::models::{MetadataEntry, Release, Series};
use crate::utils::error::{DownloadError, FetchError};
use crate::utils::retry::parse_retry_after;

/// Source of the series the user currently monitors
#[async_trait]
pub trait SeriesSource: Send + Sync {
    /// Monitored series, or `None` when the source could not be read
    async fn monitored_series(&self) -> Option<Vec<Series>>;
}

/// Title search returning candidate metadata entries
#[async_trait]
pub trait MetadataSearch: Send + Sync {
    /// Entries matching `title` sorted by season year, or `None` on failure
    async fn search(&self, title: &str) -> Option<Vec<MetadataEntry>>;
}

/// Curated release listing keyed by metadata id
#[async_trait]
pub trait ReleaseIndex: Send + Sync {
    /// Releases listed for `anilist_id` in listing order, or `None` on failure
    async fn releases(&self, anilist_id: i64) -> Option<Vec<Release>>;
}

/// Receiver of newly selected releases
#[async_trait]
pub trait DownloadClient: Send + Sync {
    /// Hand a release over for download
    async fn submit(&self, release: &Release) -> Result<SubmitOutcome, DownloadError>;
}

/// Result of a download submission that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Magnet handed to the download client
    Sent,
    /// Private release, reported for manual download only
    Declined,
}

impl SubmitOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Declined => "declined",
        }
    }
}

/// Build the shared HTTP client
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(std::time::Duration::from_secs(config.timeout_secs))
        .user_agent(config.user_agent.clone())
        .gzip(true)
        .build()
}

/// Classify a response status into a per-attempt outcome
pub(crate) fn check_status(response: Response) -> Result<Response, FetchError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    if status.as_u16() == 429 {
        return Err(FetchError::RateLimited {
            retry_after: parse_retry_after(response.headers()),
        });
    }

    Err(FetchError::Status(status.as_u16()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_outcome_labels() {
        assert_eq!(SubmitOutcome::Sent.as_str(), "sent");
        assert_eq!(SubmitOutcome::Declined.as_str(), "declined");
    }

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client(&HttpConfig::default()).is_ok());
    }
}
