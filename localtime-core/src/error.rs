//! Error types for localtime-core

use thiserror::Error;

/// Main error type for the localtime-core library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Timestamp could not be parsed into a point in time
    #[error("invalid timestamp: {0:?}")]
    InvalidTimestamp(String),

    /// Mode selector is not one of the known literals
    #[error("unrecognized display mode: {0:?}")]
    UnrecognizedMode(String),

    /// Locale tag is empty or malformed
    #[error("invalid locale tag: {0:?}")]
    InvalidLocale(String),

    /// Bad input glob pattern
    #[error("invalid input pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

/// Result type alias for localtime-core
pub type Result<T> = std::result::Result<T, Error>;
