//! Error types for sitepipe.
//!
//! Library crates use [`SitePipeError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Only fatal conditions travel as errors. Per-record rejections and a
//! malformed prior sitemap are recoverable and are logged instead.

use std::path::PathBuf;

/// Top-level error type for all sitepipe operations.
#[derive(Debug, thiserror::Error)]
pub enum SitePipeError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Bulk content fetch failed (transport, HTTP status, timeout).
    #[error("fetch error: {0}")]
    Fetch(String),

    /// Malformed bulk response or document.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Detail page rendering error.
    #[error("render error: {0}")]
    Render(String),

    /// Sitemap serialization or persistence error.
    #[error("sitemap error: {0}")]
    Sitemap(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SitePipeError>;

impl SitePipeError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
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
        let err = SitePipeError::config("missing space id");
        assert_eq!(err.to_string(), "config error: missing space id");

        let err = SitePipeError::Fetch("https://cdn.example.com: HTTP 503".into());
        assert!(err.to_string().starts_with("fetch error:"));
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn io_error_keeps_path() {
        let err = SitePipeError::io(
            "dist/data.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("dist/data.json"));
        assert!(msg.contains("denied"));
    }
}
