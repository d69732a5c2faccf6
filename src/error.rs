//! Error types shared by the fetcher, paginator, store and token handling.

use thiserror::Error;

/// Errors surfaced by spotwatch operations.
#[derive(Error, Debug)]
pub enum WatchError {
    /// A caller-supplied argument violates a precondition
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The Spotify API answered with a non-success status
    #[error("Upstream error ({status}): {body}")]
    Upstream { status: u16, body: String },

    /// HTTP request failed before a response was received
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Response body could not be decoded
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// History database failure
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// No usable access token
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Missing or malformed configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WatchError {
    pub fn invalid(message: impl Into<String>) -> Self {
        WatchError::InvalidParameter(message.into())
    }
}

/// Result type for spotwatch operations.
pub type Result<T> = std::result::Result<T, WatchError>;
