//! Error types for the seadex monitor
//!
//! This module defines the domain-specific error types used by the HTTP
//! collaborators and the snapshot store.

use std::time::Duration;
use thiserror::Error;

/// Outcome of a single failed request attempt
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered 429 Too Many Requests
    #[error("Rate limit exceeded")]
    RateLimited {
        /// Parsed `Retry-After` header, if present
        retry_after: Option<Duration>,
    },

    /// Non-success status other than 429
    #[error("Server returned status {0}")]
    Status(u16),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Response body could not be decoded
    #[error("Decoding error: {0}")]
    Decode(String),
}

impl FetchError {
    /// Build from a transport error, separating timeouts
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Http(err)
        }
    }

    /// Short label used in logs and metrics
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Http(_) => "http",
            Self::RateLimited { .. } => "rate_limited",
            Self::Status(_) => "status",
            Self::Timeout => "timeout",
            Self::Decode(_) => "decode",
        }
    }
}

/// Errors from reading or writing the persisted snapshot
#[derive(Error, Debug)]
pub enum StorageError {
    /// Snapshot file could not be read or written
    #[error("Snapshot I/O failed for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Snapshot is not valid JSON
    #[error("Snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Snapshot JSON does not have the expected shape
    #[error("Malformed snapshot document: {0}")]
    Malformed(String),
}

/// Errors from submitting a release to the download client
#[derive(Error, Debug)]
pub enum DownloadError {
    /// Login rejected
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Download client rejected the request
    #[error("Download client returned status {status}: {message}")]
    Api { status: u16, message: String },

    /// Transport error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_reason() {
        assert_eq!(FetchError::RateLimited { retry_after: None }.reason(), "rate_limited");
        assert_eq!(FetchError::Status(503).reason(), "status");
        assert_eq!(FetchError::Timeout.reason(), "timeout");
    }

    #[test]
    fn test_display() {
        assert_eq!(FetchError::Status(502).to_string(), "Server returned status 502");
        assert_eq!(
            StorageError::Malformed("root is not an array".into()).to_string(),
            "Malformed snapshot document: root is not an array"
        );
        let err = DownloadError::Api {
            status: 415,
            message: "bad torrent".into(),
        };
        assert_eq!(err.to_string(), "Download client returned status 415: bad torrent");
    }
}
