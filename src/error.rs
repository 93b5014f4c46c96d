//! Error types for brc-pipeline
//!
//! Every failure a pipeline can hit is expressed as one [`Error`] variant, and every
//! variant belongs to exactly one [`ErrorKind`]. Retry decisions are made on the kind,
//! never on the message text:
//! - `source_unavailable` / `sink_unavailable` / `network` - transient, retryable by default
//! - `data_invalid` / `validation` / `io` - permanent for the current run
//! - `configuration_invalid` - fatal, never retried

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias for brc-pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for brc-pipeline
#[derive(Debug, Error)]
pub enum Error {
    /// Upstream API unreachable or answered with a non-success status
    #[error("source {source_name} unavailable: {message}")]
    SourceUnavailable {
        /// Name of the upstream service (e.g. "synoptic")
        source_name: String,
        /// Human-readable description of the failure
        message: String,
        /// HTTP status returned by the upstream, if one was received
        status_code: Option<u16>,
    },

    /// Fetched or processed payload is missing required fields
    #[error("invalid data: {0}")]
    DataInvalid(String),

    /// Destination upload failed or timed out
    #[error("sink {endpoint} unavailable: {message}")]
    SinkUnavailable {
        /// Endpoint or path the data was being delivered to
        endpoint: String,
        /// Human-readable description of the failure
        message: String,
        /// HTTP status returned by the sink, if one was received
        status_code: Option<u16>,
    },

    /// Missing or malformed credentials, URLs or settings
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g. "DATA_UPLOAD_API_KEY")
        key: Option<String>,
    },

    /// Record failed a validation check
    #[error("validation error: {0}")]
    Validation(String),

    /// Transport-level HTTP error that was not mapped to a source or sink
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a configuration error tied to a specific key
    pub fn config(message: impl Into<String>, key: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Shorthand for an upstream failure without an HTTP status
    pub fn source_unavailable(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::SourceUnavailable {
            source_name: source_name.into(),
            message: message.into(),
            status_code: None,
        }
    }

    /// Shorthand for a delivery failure without an HTTP status
    pub fn sink_unavailable(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Error::SinkUnavailable {
            endpoint: endpoint.into(),
            message: message.into(),
            status_code: None,
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::SourceUnavailable { .. } => ErrorKind::SourceUnavailable,
            Error::DataInvalid(_) | Error::Serialization(_) => ErrorKind::DataInvalid,
            Error::SinkUnavailable { .. } => ErrorKind::SinkUnavailable,
            Error::Config { .. } => ErrorKind::ConfigurationInvalid,
            Error::Validation(_) => ErrorKind::Validation,
            Error::Network(_) => ErrorKind::Network,
            Error::Io(_) => ErrorKind::Io,
        }
    }

    /// HTTP status code attached to a source or sink failure
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::SourceUnavailable { status_code, .. }
            | Error::SinkUnavailable { status_code, .. } => *status_code,
            Error::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Coarse classification of [`Error`] used by retry policies
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Upstream API unreachable or non-success
    SourceUnavailable,
    /// Payload missing required fields or unparsable
    DataInvalid,
    /// Destination upload failed
    SinkUnavailable,
    /// Missing or malformed configuration; never retried
    ConfigurationInvalid,
    /// Record failed validation
    Validation,
    /// Unmapped transport error
    Network,
    /// Local filesystem error
    Io,
}

impl ErrorKind {
    /// Stable snake_case name, as used in configuration and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::SourceUnavailable => "source_unavailable",
            ErrorKind::DataInvalid => "data_invalid",
            ErrorKind::SinkUnavailable => "sink_unavailable",
            ErrorKind::ConfigurationInvalid => "configuration_invalid",
            ErrorKind::Validation => "validation",
            ErrorKind::Network => "network",
            ErrorKind::Io => "io",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
