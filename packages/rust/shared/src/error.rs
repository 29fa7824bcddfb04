//! Error types for the blueprint annotator.
//!
//! Library crates use [`AnnotatorError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all annotator operations.
#[derive(Debug, thiserror::Error)]
pub enum AnnotatorError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transport-level failure talking to the generation service.
    #[error("network error: {0}")]
    Network(String),

    /// Remote generation failed or returned a response we could not decode.
    #[error("generation error: {0}")]
    Generation(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// User input rejected before any remote call was made.
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, AnnotatorError>;

impl AnnotatorError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
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

    /// True for errors raised before any remote call (bad user input).
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = AnnotatorError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = AnnotatorError::validation("select at least one topic");
        assert!(err.to_string().contains("at least one topic"));
        assert!(err.is_validation());
    }

    #[test]
    fn generation_error_is_not_validation() {
        let err = AnnotatorError::Generation("quota exceeded".into());
        assert_eq!(err.to_string(), "generation error: quota exceeded");
        assert!(!err.is_validation());
    }
}
