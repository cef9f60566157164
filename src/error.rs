//! Error classification for the seadex monitor
//!
//! Domain errors live next to the code that raises them (see
//! [`crate::utils::error`]). This module gives them a common interface so
//! callers can log and count failures uniformly.
//!
//! - [`MonitorError`] - Common interface implemented by all error types
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//!
//! None of these ever escape a sync pass. Collaborator failures degrade to
//! "no data for this item", and the pass carries on.

pub use crate::utils::error::{DownloadError, FetchError, StorageError};

/// Common trait for all seadex monitor error types
pub trait MonitorError: std::error::Error {
    /// Check if this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network-related errors (HTTP, timeout, rate limit)
    Network,
    /// Snapshot and I/O errors
    Storage,
    /// Download client errors
    Download,
    /// Response or document decoding errors
    Parsing,
}

impl ErrorCategory {
    /// Stable label for logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Storage => "storage",
            Self::Download => "download",
            Self::Parsing => "parsing",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl MonitorError for FetchError {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Http(_) | Self::RateLimited { .. } | Self::Timeout => true,
            Self::Status(code) => *code >= 500,
            Self::Decode(_) => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Decode(_) => ErrorCategory::Parsing,
            _ => ErrorCategory::Network,
        }
    }
}

impl MonitorError for StorageError {
    fn is_recoverable(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Io { .. } => ErrorCategory::Storage,
            Self::Json(_) | Self::Malformed(_) => ErrorCategory::Parsing,
        }
    }
}

impl MonitorError for DownloadError {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Auth(_) => false,
            Self::Api { status, .. } => *status >= 500,
            Self::Http(_) => true,
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Download
    }
}
