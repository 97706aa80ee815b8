//! Error types for the market monitor

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when talking to the auction service
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// Transport failure, timeout, non-success status or an unusable rate
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Payload is missing expected fields or could not be decoded
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl ProviderError {
    /// Creates an UpstreamUnavailable error
    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::UpstreamUnavailable(msg.into())
    }

    /// Creates a MalformedResponse error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::UpstreamUnavailable(format!("request timed out: {}", err))
        } else if err.is_decode() {
            Self::MalformedResponse(err.to_string())
        } else {
            Self::UpstreamUnavailable(err.to_string())
        }
    }
}

/// The tailed log file could not be opened or read
#[derive(Debug, Error)]
#[error("Cannot access log file {}: {source}", .path.display())]
pub struct FileAccessError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

impl FileAccessError {
    pub fn new(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }
}

/// Errors raised by a speech output engine
#[derive(Debug, Error)]
pub enum SpeechError {
    /// The engine could not be acquired
    #[error("Speech engine unavailable: {0}")]
    Unavailable(String),

    /// The engine failed while speaking
    #[error("Speech playback failed: {0}")]
    Playback(String),
}

/// Errors returned when submitting an announcement
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The dispatcher has been shut down
    #[error("Announcement dispatcher is closed")]
    Closed,
}
