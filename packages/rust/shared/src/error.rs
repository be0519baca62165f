//! Error types for blockpath.
//!
//! Library crates use [`BlockpathError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Expected outcomes are deliberately not errors here: a block missing from a
//! tree is `None`, a stale fetch result is dropped, and an unreadable fragment
//! becomes [`crate::Fragment::Unknown`].

use std::path::PathBuf;

/// Top-level error type for all blockpath operations.
#[derive(Debug, thiserror::Error)]
pub enum BlockpathError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transport-level failure talking to the host editor API.
    #[error("network error: {0}")]
    Network(String),

    /// The host editor API answered a call with a failure status.
    #[error("host API call {method} failed: {message}")]
    Host { method: String, message: String },

    /// A host response could not be decoded into the content model.
    #[error("decode error: {message}")]
    Decode { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad config values, malformed dumps, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BlockpathError>;

impl BlockpathError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a decode error from any displayable message.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode {
            message: msg.into(),
        }
    }

    /// Create a host error for a failed API method.
    pub fn host(method: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Host {
            method: method.into(),
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
