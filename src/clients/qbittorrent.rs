//! qBittorrent WebUI download client

use async_trait::async_trait;
use reqwest::Client;
use tracing::{info, warn};

use super::{DownloadClient, SubmitOutcome};
use crate::config::{HttpConfig, QBittorrentConfig};
use crate::models::Release;
use crate::utils::error::DownloadError;
use crate::utils::join_url;

const LOGIN_PATH: &str = "api/v2/auth/login";
const ADD_PATH: &str = "api/v2/torrents/add";
const OK_BODY: &str = "Ok.";

/// qBittorrent WebUI client
///
/// Holds its own cookie-enabled HTTP client so the session cookie from the
/// login call is sent with the add call.
pub struct QBittorrentClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
    category: String,
}

impl QBittorrentClient {
    pub fn new(config: &QBittorrentConfig, http: &HttpConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(http.timeout_secs))
            .user_agent(http.user_agent.clone())
            .cookie_store(true)
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            category: config.category.clone(),
        })
    }

    async fn login(&self) -> Result<(), DownloadError> {
        let response = self
            .client
            .post(join_url(&self.base_url, LOGIN_PATH))
            .form(&[("username", &self.username), ("password", &self.password)])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() || body.trim() != OK_BODY {
            return Err(DownloadError::Auth(format!(
                "login rejected with status {}: {}",
                status.as_u16(),
                body.trim()
            )));
        }

        Ok(())
    }

    async fn add_magnet(&self, magnet: &str) -> Result<(), DownloadError> {
        let mut form = vec![("urls", magnet)];
        if !self.category.is_empty() {
            form.push(("category", self.category.as_str()));
        }

        let response = self
            .client
            .post(join_url(&self.base_url, ADD_PATH))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() || body.trim() != OK_BODY {
            return Err(DownloadError::Api {
                status: status.as_u16(),
                message: body.trim().to_string(),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl DownloadClient for QBittorrentClient {
    async fn submit(&self, release: &Release) -> Result<SubmitOutcome, DownloadError> {
        let Some(magnet) = release.magnet_link() else {
            warn!(
                id = %release.id,
                tracker = %release.tracker,
                url = %release.url,
                "Private release selected, download it manually"
            );
            return Ok(SubmitOutcome::Declined);
        };

        self.login().await?;
        self.add_magnet(&magnet).await?;

        info!(id = %release.id, tracker = %release.tracker, "Submitted magnet to qBittorrent");
        Ok(SubmitOutcome::Sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::REDACTED_HASH;

    #[tokio::test]
    async fn test_private_release_declined_without_request() {
        let config = QBittorrentConfig {
            // Nothing listens here; a request would fail the test
            url: "http://127.0.0.1:9".to_string(),
            ..Default::default()
        };
        let client = QBittorrentClient::new(&config, &HttpConfig::default()).unwrap();
        let release = Release::new("p1", REDACTED_HASH, "AB", "https://ab/torrents/1");

        let outcome = client.submit(&release).await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Declined);
    }
}
