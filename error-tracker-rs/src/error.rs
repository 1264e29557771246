//! # Tracker Error Types
//!
//! Errors raised internally by the tracker. Public tracker operations never
//! return these to callers; they are logged and the tracker keeps running on
//! whatever in-memory state it has.

use std::path::PathBuf;

/// A type alias for Result with the error type defaulting to [`TrackerError`]
pub type Result<T, E = TrackerError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid tag '{0}'")]
    InvalidTag(String),

    #[error("Invalid severity '{0}'")]
    InvalidSeverity(String),

    #[error("Invalid user impact '{0}'")]
    InvalidUserImpact(String),

    #[error("Invalid configuration value: {0}")]
    Config(String),
}

impl TrackerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}

impl From<config::ConfigError> for TrackerError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
