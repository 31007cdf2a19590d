//! Error types for orbitscrape.
//!
//! Library crates use [`OrbitScrapeError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all orbitscrape operations.
#[derive(Debug, thiserror::Error)]
pub enum OrbitScrapeError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// A fetch could not complete (connection, timeout, bad status, body read).
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with an explicit not-found status.
    #[error("not found: {url}")]
    NotFound { url: String },

    /// A selector or pattern matched nothing usable.
    #[error("extraction error: {message}")]
    Extraction { message: String },

    /// Output store error that is not a plain I/O failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, OrbitScrapeError>;

impl OrbitScrapeError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create an extraction error from any displayable message.
    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::Extraction {
            message: msg.into(),
        }
    }

    /// Create a not-found error for the given URL.
    pub fn not_found(url: impl Into<String>) -> Self {
        Self::NotFound { url: url.into() }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error is an explicit not-found response.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = OrbitScrapeError::config("start_id 10 is greater than end_id 5");
        assert_eq!(
            err.to_string(),
            "config error: start_id 10 is greater than end_id 5"
        );

        let err = OrbitScrapeError::extraction("no trailing digits in '/satellites/'");
        assert!(err.to_string().contains("/satellites/"));
    }

    #[test]
    fn not_found_is_distinguishable() {
        let err = OrbitScrapeError::not_found("https://static.example.com/99999.jpg");
        assert!(err.is_not_found());
        assert!(!OrbitScrapeError::Transport("timeout".into()).is_not_found());
    }
}
