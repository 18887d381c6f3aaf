//! Error types for the paired sample dataset.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur while building or reading the paired dataset.
#[derive(Error, Debug)]
pub enum DatasetError {
    /// Bad construction parameters (empty year set, zero standard deviation,
    /// mismatched channel lists, unknown channel names, ...).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An archive location could not be opened or is malformed.
    #[error("failed to open archive {path}: {reason}")]
    ArchiveOpen { path: String, reason: String },

    /// No archive of the tier covers the requested calendar year.
    #[error("no {tier} archive covers year {year}")]
    YearNotFound { tier: String, year: i32 },

    /// The archive has no time coordinate exactly equal to the timestamp.
    #[error("timestamp {timestamp} not found in {year} archive")]
    TimestampNotFound { year: i32, timestamp: DateTime<Utc> },

    /// Sample index outside `0..len`.
    #[error("sample index {index} out of range for dataset of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// Normalization statistics could not be read.
    #[error("failed to load statistics from {path}: {reason}")]
    StatsLoad { path: String, reason: String },

    /// Failed to read data from an already opened archive.
    #[error("failed to read archive data: {0}")]
    Read(String),

    /// Failed to write an archive or statistics file.
    #[error("failed to write: {0}")]
    Write(String),

    /// Storage/IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DatasetError {
    /// Create a Configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an ArchiveOpen error.
    pub fn archive_open(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::ArchiveOpen {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a StatsLoad error.
    pub fn stats_load(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::StatsLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a Read error.
    pub fn read(msg: impl ToString) -> Self {
        Self::Read(msg.to_string())
    }

    /// Create a Write error.
    pub fn write(msg: impl ToString) -> Self {
        Self::Write(msg.to_string())
    }

    /// True for errors that can only come from bad setup, not from a lookup.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

impl From<serde_yaml::Error> for DatasetError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Configuration(err.to_string())
    }
}

/// Result type for dataset operations.
pub type Result<T> = std::result::Result<T, DatasetError>;
