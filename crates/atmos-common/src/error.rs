//! Error types for the profile sampling pipeline.
//!
//! Every kind is fatal for a run and propagates to the caller; nothing in the
//! pipeline retries or falls back to a different backend.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result type alias using ProfileError.
pub type ProfileResult<T> = Result<T, ProfileError>;

/// Malformed or missing run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required configuration field: {0}")]
    MissingField(&'static str),

    #[error("Invalid value for '{field}': {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },

    #[error("Empty altitude token at position {position} in '{list}'")]
    EmptyAltitudeToken { position: usize, list: String },

    #[error("step_seconds must be positive, got {0}")]
    NonPositiveStep(i64),

    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    #[error("Invalid command-line arguments: {0}")]
    Arguments(String),

    #[error("Failed to load defaults file: {0}")]
    DefaultsFile(String),
}

impl ConfigError {
    /// Create an InvalidValue error.
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            message: message.into(),
        }
    }
}

/// The selected atmospheric model could not be constructed.
#[derive(Debug, Error)]
#[error("Atmospheric model backend '{backend}' unavailable: {reason}")]
pub struct BackendUnavailableError {
    pub backend: String,
    pub reason: String,
}

impl BackendUnavailableError {
    pub fn new(backend: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            reason: reason.into(),
        }
    }
}

/// A single evaluation produced unusable physical data.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("{field} is not a finite non-negative value: {value}")]
    InvalidValue { field: &'static str, value: f64 },

    #[error("Model evaluation failed: {0}")]
    Evaluation(String),
}

/// A backend failure tied to the grid point that caused it.
#[derive(Debug, Error)]
#[error(
    "Sampling aborted at grid point {index} (time {}, altitude {altitude_m} m): {source}",
    time.format("%Y-%m-%dT%H:%M:%S")
)]
pub struct SamplingError {
    /// Position of the point in enumeration order
    pub index: usize,
    pub time: DateTime<Utc>,
    pub altitude_m: f64,
    #[source]
    pub source: BackendError,
}

/// Reading or writing the output table failed.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Table has no header line")]
    MissingHeader,

    #[error("Malformed table row at line {line}: {message}")]
    Malformed { line: usize, message: String },
}

impl TableError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn malformed(line: usize, message: impl Into<String>) -> Self {
        Self::Malformed {
            line,
            message: message.into(),
        }
    }
}

/// Top-level error for one pipeline run.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    BackendUnavailable(#[from] BackendUnavailableError),

    #[error(transparent)]
    Sampling(#[from] SamplingError),

    #[error(transparent)]
    Table(#[from] TableError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sampling_error_names_the_grid_point() {
        let err = SamplingError {
            index: 7,
            time: Utc.with_ymd_and_hms(2025, 8, 17, 0, 30, 0).unwrap(),
            altitude_m: 400000.0,
            source: BackendError::InvalidValue {
                field: "o_density",
                value: -1.0,
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("grid point 7"));
        assert!(msg.contains("2025-08-17T00:30:00"));
        assert!(msg.contains("400000"));
        assert!(msg.contains("o_density"));
    }

    #[test]
    fn test_profile_error_is_transparent() {
        let err: ProfileError = ConfigError::MissingField("start").into();
        assert_eq!(err.to_string(), "Missing required configuration field: start");
    }
}
