//! Error types for pubsync.
//!
//! Library crates use [`PubSyncError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all pubsync operations.
#[derive(Debug, thiserror::Error)]
pub enum PubSyncError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// A fetch strategy could not produce a listing (session, timeout, navigation).
    #[error("fetch failed ({strategy}): {message}")]
    Fetch { strategy: String, message: String },

    /// A single listing entry could not be extracted.
    #[error("row {index} could not be extracted: {message}")]
    RowExtraction { index: usize, message: String },

    /// The anchor heading or its list container is missing from a document.
    #[error("anchor not found: {message}")]
    AnchorNotFound { message: String },

    /// Network/HTTP error talking to a remote service.
    #[error("network error: {0}")]
    Network(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad record file, invalid format, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PubSyncError>;

impl PubSyncError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a fetch failure attributed to a named strategy.
    pub fn fetch(strategy: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Fetch {
            strategy: strategy.into(),
            message: msg.into(),
        }
    }

    /// Create a per-row extraction failure.
    pub fn row(index: usize, msg: impl Into<String>) -> Self {
        Self::RowExtraction {
            index,
            message: msg.into(),
        }
    }

    /// Create an anchor-not-found failure.
    pub fn anchor_not_found(msg: impl Into<String>) -> Self {
        Self::AnchorNotFound {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = PubSyncError::config("missing documents");
        assert_eq!(err.to_string(), "config error: missing documents");

        let err = PubSyncError::fetch("interactive", "timed out waiting for rows");
        assert_eq!(
            err.to_string(),
            "fetch failed (interactive): timed out waiting for rows"
        );

        let err = PubSyncError::row(7, "no title element");
        assert!(err.to_string().contains("row 7"));
    }

    #[test]
    fn io_error_keeps_path() {
        let source = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = PubSyncError::io("/tmp/publication.html", source);
        assert!(err.to_string().contains("publication.html"));
    }
}
