//! seadex-monitor - keep Sonarr anime in sync with SeaDex best releases
//!
//! Periodically reads the series monitored in Sonarr, maps each one to its
//! AniList entries, looks up the curated releases SeaDex lists for every
//! entry, picks the best release per entry and hands newly picked public
//! releases to qBittorrent. The merged state is persisted between passes.
//!
//! # Architecture
//!
//! - [`config`] - Configuration management and settings
//! - [`models`] - Series, metadata entry and release value types
//! - [`reconcile`] - Merge policies and best-release selection
//! - [`clients`] - Sonarr, AniList, SeaDex and qBittorrent collaborators
//! - [`storage`] - Snapshot persistence
//! - [`sync`] - Pass orchestration and scheduling
//! - [`server`] - Webhook listener
//! - [`metrics`] - Prometheus metrics
//! - [`utils`] - Rate limiting, retries and helpers
//!
//! # Example
//!
//! ```no_run
//! use seadex_monitor::config::Config;
//! use seadex_monitor::sync::{SyncEngine, Trigger};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(None)?;
//!     let engine = SyncEngine::from_config(&config)?;
//!     let report = engine.run_pass(Trigger::Manual).await;
//!     println!("{} selections", report.selections);
//!     Ok(())
//! }
//! ```

pub mod clients;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod reconcile;
pub mod server;
pub mod storage;
pub mod sync;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::clients::{DownloadClient, MetadataSearch, ReleaseIndex, SeriesSource, SubmitOutcome};
    pub use crate::config::Config;
    pub use crate::error::{ErrorCategory, MonitorError};
    pub use crate::models::{MetadataEntry, Release, Series};
    pub use crate::reconcile::ScoringWeights;
    pub use crate::storage::SnapshotStore;
    pub use crate::sync::{PassReport, SyncEngine, Trigger};
}

// Direct re-exports for convenience
pub use models::{MetadataEntry, Release, Series};
