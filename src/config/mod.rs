//! Configuration management for the seadex monitor
//!
//! Configuration is read from a TOML file where every section is optional,
//! then selected values are overridden from environment variables, and the
//! result is validated.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::reconcile::ScoringWeights;
use crate::utils::rate_limit::RateLimitConfig;
use crate::utils::retry::RetryPolicy;
use crate::utils::{mask_secret, validate_http_url};

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "SEADEX_MONITOR_CONFIG";

/// Config file used when none is given
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scheduling of sync passes
    pub sync: SyncConfig,

    /// Snapshot location
    pub storage: StorageConfig,

    /// Shared HTTP client settings
    pub http: HttpConfig,

    /// Retry behavior for rate-limited APIs
    pub retry: RetryPolicy,

    /// Sonarr connection
    pub sonarr: SonarrConfig,

    /// AniList connection
    pub anilist: AniListConfig,

    /// SeaDex connection
    pub seadex: SeadexConfig,

    /// qBittorrent connection
    pub qbittorrent: QBittorrentConfig,

    /// Release scoring weights
    pub scoring: ScoringWeights,

    /// Webhook listener
    pub webhook: WebhookConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Sync scheduling configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Seconds between scheduled passes
    pub interval_secs: u64,

    /// Run a pass immediately on startup
    pub startup_scan: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60 * 60 * 24,
            startup_scan: true,
        }
    }
}

/// Snapshot storage configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding persisted state
    pub data_dir: PathBuf,

    /// File name of the series snapshot inside `data_dir`
    pub snapshot_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            snapshot_file: String::from("known_series.json"),
        }
    }
}

impl StorageConfig {
    /// Full path of the snapshot file
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(&self.snapshot_file)
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// User agent string
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: format!("seadex-monitor/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Sonarr configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SonarrConfig {
    /// Sonarr base URL
    pub url: String,

    /// API key sent as `X-Api-Key`
    pub api_key: String,

    /// Only keep series whose `seriesType` is `anime` (off keeps every
    /// monitored series)
    pub anime_only: bool,

    /// When non-empty, only keep series carrying one of these tag ids
    pub tags: Vec<i64>,
}

impl Default for SonarrConfig {
    fn default() -> Self {
        Self {
            url: String::from("http://localhost:8989"),
            api_key: String::new(),
            anime_only: false,
            tags: Vec::new(),
        }
    }
}

/// AniList configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AniListConfig {
    /// GraphQL endpoint
    pub url: String,

    /// Search results requested per query
    pub per_page: u32,

    /// Request admission limit
    pub rate_limit: RateLimitConfig,
}

impl Default for AniListConfig {
    fn default() -> Self {
        Self {
            url: String::from("https://graphql.anilist.co"),
            per_page: 10,
            rate_limit: RateLimitConfig::new(90, 60),
        }
    }
}

/// SeaDex configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeadexConfig {
    /// Collection entries endpoint
    pub entries_url: String,

    /// Torrent records endpoint
    pub torrents_url: String,

    /// Request admission limit
    pub rate_limit: RateLimitConfig,
}

impl Default for SeadexConfig {
    fn default() -> Self {
        Self {
            entries_url: String::from("https://releases.moe/api/collections/entries/records"),
            torrents_url: String::from("https://releases.moe/api/collections/torrents/records"),
            rate_limit: RateLimitConfig::new(60, 60),
        }
    }
}

/// qBittorrent configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QBittorrentConfig {
    /// WebUI base URL
    pub url: String,

    /// WebUI user name
    pub username: String,

    /// WebUI password
    pub password: String,

    /// Category assigned to submitted torrents (empty for none)
    pub category: String,
}

impl Default for QBittorrentConfig {
    fn default() -> Self {
        Self {
            url: String::from("http://localhost:8080"),
            username: String::from("admin"),
            password: String::new(),
            category: String::new(),
        }
    }
}

/// Webhook listener configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Start the listener in `run`
    pub enabled: bool,

    /// Bind host
    pub host: String,

    /// Bind port
    pub port: u16,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: String::from("127.0.0.1"),
            port: 8765,
        }
    }
}

impl WebhookConfig {
    /// Socket address to bind
    pub fn bind_address(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid webhook bind address {}:{}", self.host, self.port))
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

impl Config {
    /// Load from `path`, the `SEADEX_MONITOR_CONFIG` file, or `config.toml`
    ///
    /// A missing file falls back to defaults; a malformed one is an error.
    /// Environment overrides are applied and the result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => std::env::var(CONFIG_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE)),
        };

        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Override selected values from environment variables
    pub fn apply_env_overrides(&mut self) {
        let env = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());

        if let Some(url) = env("SONARR_URL") {
            self.sonarr.url = url;
        }
        if let Some(key) = env("SONARR_API_KEY") {
            self.sonarr.api_key = key;
        }
        if let Some(url) = env("QBITTORRENT_URL") {
            self.qbittorrent.url = url;
        }
        if let Some(username) = env("QBITTORRENT_USERNAME") {
            self.qbittorrent.username = username;
        }
        if let Some(password) = env("QBITTORRENT_PASSWORD") {
            self.qbittorrent.password = password;
        }
        if let Some(dir) = env("SEADEX_MONITOR_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(level) = env("SEADEX_MONITOR_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.sync.interval_secs == 0 {
            anyhow::bail!("sync.interval_secs must be greater than 0");
        }

        for (name, limit) in [
            ("anilist", &self.anilist.rate_limit),
            ("seadex", &self.seadex.rate_limit),
        ] {
            if limit.max_requests == 0 {
                anyhow::bail!("{name}.rate_limit.max_requests must be greater than 0");
            }
            if limit.window_seconds == 0 {
                anyhow::bail!("{name}.rate_limit.window_seconds must be greater than 0");
            }
        }

        if self.http.timeout_secs == 0 {
            anyhow::bail!("http.timeout_secs must be greater than 0");
        }

        if self.storage.snapshot_file.trim().is_empty() {
            anyhow::bail!("storage.snapshot_file cannot be empty");
        }

        for (name, url) in [
            ("sonarr.url", &self.sonarr.url),
            ("anilist.url", &self.anilist.url),
            ("seadex.entries_url", &self.seadex.entries_url),
            ("seadex.torrents_url", &self.seadex.torrents_url),
            ("qbittorrent.url", &self.qbittorrent.url),
        ] {
            validate_http_url(url).with_context(|| format!("{name} is invalid"))?;
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            anyhow::bail!("logging.format must be 'text' or 'json'");
        }

        Ok(())
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }

    /// Get sync interval as Duration
    #[must_use]
    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync.interval_secs)
    }

    /// Copy of the configuration with secrets masked, for display
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.sonarr.api_key = mask_secret(&copy.sonarr.api_key);
        copy.qbittorrent.password = mask_secret(&copy.qbittorrent.password);
        copy
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_rate_limit() {
        let mut config = Config::default();
        config.anilist.rate_limit.max_requests = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.seadex.rate_limit.window_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_url() {
        let mut config = Config::default();
        config.qbittorrent.url = String::from("localhost:8080");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [scoring]
            is_best_weight = 5

            [scoring.tracker_weights]
            Nyaa = 2
            default = -1

            [anilist.rate_limit]
            max_requests = 30
            window_seconds = 60
            "#,
        )
        .unwrap();

        assert_eq!(config.scoring.is_best_weight, 5);
        assert_eq!(config.scoring.dual_audio_weight, 1);
        assert_eq!(config.scoring.tracker_weight("Nyaa"), 2);
        assert_eq!(config.scoring.tracker_weight("Other"), -1);
        assert_eq!(config.anilist.rate_limit.max_requests, 30);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.sync.interval_secs, 86_400);
        assert!(!config.sonarr.anime_only);
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = Config::default();
        let rendered = config.to_toml().unwrap();
        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_redacted_masks_secrets() {
        let mut config = Config::default();
        config.sonarr.api_key = String::from("0123456789abcdef");
        config.qbittorrent.password = String::from("hunter2");

        let redacted = config.redacted();
        assert_eq!(redacted.sonarr.api_key, "************cdef");
        assert_eq!(redacted.qbittorrent.password, "***ter2");
    }

    #[test]
    fn test_snapshot_path() {
        let config = Config::default();
        assert_eq!(
            config.storage.snapshot_path(),
            PathBuf::from("data").join("known_series.json")
        );
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        std::env::set_var("SONARR_API_KEY", "from-env");
        std::env::set_var("SEADEX_MONITOR_DATA_DIR", "/tmp/seadex-state");

        let mut config = Config::default();
        config.apply_env_overrides();

        std::env::remove_var("SONARR_API_KEY");
        std::env::remove_var("SEADEX_MONITOR_DATA_DIR");

        assert_eq!(config.sonarr.api_key, "from-env");
        assert_eq!(config.storage.data_dir, PathBuf::from("/tmp/seadex-state"));
    }

    #[test]
    #[serial]
    fn test_load_missing_file_uses_defaults() {
        let config = Config::load(Some(Path::new("/nonexistent/seadex-monitor.toml"))).unwrap();
        assert_eq!(config.webhook.port, 8765);
    }
}
