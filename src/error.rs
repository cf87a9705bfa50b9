//! Error handling for devscope
//!
//! Scan-path failures (refused probes, unreachable hosts, bad port entries) are
//! expected and never surface as errors. `ScanError` covers the surrounding
//! machinery: configuration, serialization, observer delivery and the server.

use thiserror::Error;

/// Main error type for devscope operations
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Observer closed")]
    ObserverClosed,

    #[error("Observer is not keeping up ({0} snapshots queued)")]
    ObserverBacklogged(usize),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<serde_json::Error> for ScanError {
    fn from(err: serde_json::Error) -> Self {
        ScanError::SerializationError(err.to_string())
    }
}

impl From<reqwest::Error> for ScanError {
    fn from(err: reqwest::Error) -> Self {
        ScanError::HttpError(err.to_string())
    }
}
