//! Error types shared by the relay crates.

use thiserror::Error;

/// Errors raised while loading configuration, reading inbound context, or
/// handling JSON documents.
#[derive(Debug, Error)]
pub enum CommonError {
    /// I/O error (reading configuration or JSON files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML deserialization error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid or missing configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The inbound request does not describe a usable server address.
    #[error("Inbound context error: {0}")]
    Context(String),

    /// The session backend failed while looking up a cookie.
    #[error("Session error: {0}")]
    Session(String),
}

/// Result type alias using `CommonError`.
pub type Result<T> = std::result::Result<T, CommonError>;
