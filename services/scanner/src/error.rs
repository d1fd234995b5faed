//! Error types for the scanner service

use candlescan_types::SeriesError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    /// Transient exchange/API failure: log at warning level and skip the
    /// instrument for this pass.
    #[error("remote service unavailable: {message}")]
    RemoteUnavailable { message: String },

    #[error("malformed exchange payload: {message}")]
    MalformedPayload { message: String },

    #[error(transparent)]
    Series(#[from] SeriesError),

    #[error("classification error: {message}")]
    Classification { message: String },

    #[error("storage error: {message}")]
    Storage { message: String },

    #[error("notification error: {message}")]
    Notification { message: String },

    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScanError {
    /// Transient remote failure, to be logged-and-skipped rather than
    /// reported as a processing error.
    pub fn is_remote_unavailable(&self) -> bool {
        matches!(self, ScanError::RemoteUnavailable { .. })
    }

    /// Fewer candles than the analysis minimum.
    pub fn is_insufficient_history(&self) -> bool {
        matches!(
            self,
            ScanError::Series(SeriesError::InsufficientHistory { .. })
        )
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
