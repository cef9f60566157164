//! Persisted snapshot of the series tree
//!
//! Loaded at the start of a pass and overwritten at the end. A snapshot that
//! cannot be read or decoded is treated as empty so the pass still runs;
//! override flags stored in it are lost for that cycle.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use super::document::{series_from_document, series_to_document};
use crate::models::Series;
use crate::utils::error::StorageError;

/// JSON file store for the series tree
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot, falling back to an empty tree
    pub async fn load(&self) -> Vec<Series> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No snapshot yet, starting empty");
            return Vec::new();
        }

        match self.try_load().await {
            Ok(series) => {
                debug!(path = %self.path.display(), series = series.len(), "Snapshot loaded");
                series
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Snapshot unreadable, starting from an empty tree"
                );
                Vec::new()
            }
        }
    }

    /// Load the snapshot, reporting why it could not be read
    pub async fn try_load(&self) -> Result<Vec<Series>, StorageError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| self.io_error(source))?;

        let document = serde_json::from_str(&content)?;
        series_from_document(document)
    }

    /// Overwrite the snapshot
    ///
    /// Writes a sibling temp file and renames it over the target, so a
    /// reader never sees a partial document. Every save gets its own temp
    /// file; overlapping saves each land whole and the last rename wins.
    pub async fn save(&self, series: &[Series]) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| self.io_error(source))?;
        }

        let content = serde_json::to_string_pretty(&series_to_document(series))?;
        let temp_path = self.temp_path();

        tokio::fs::write(&temp_path, content)
            .await
            .map_err(|source| self.io_error(source))?;

        if let Err(source) = tokio::fs::rename(&temp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(self.io_error(source));
        }

        debug!(path = %self.path.display(), series = series.len(), "Snapshot saved");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(format!(".{}.tmp", Uuid::new_v4().simple()));
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}
