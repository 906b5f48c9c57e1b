//! Recorder Errors
//!
//! Only setup can fail recoverably. Misusing the recorder's call order is a
//! caller bug and panics instead, since the stream cannot be repaired.

use thiserror::Error;

/// Errors surfaced by the recorder and its sinks.
#[derive(Debug, Error)]
pub enum RecorderError {
    /// Header JSON could not be serialised.
    #[error("header serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Underlying writer failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration value could not be parsed.
    #[error("invalid configuration for {key}: {value:?}")]
    Config {
        /// Environment variable name.
        key: &'static str,
        /// Rejected value.
        value: String,
    },

    /// Network protocol version is neither 0.6 nor 0.7.
    #[error("invalid protocol version: {0}")]
    InvalidProtocol(i32),
}
