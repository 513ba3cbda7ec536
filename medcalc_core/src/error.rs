//! Error types for the medcalc_core library.

use std::io;

use crate::textgen::ServiceError;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for medcalc_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A calculation or form precondition was violated
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session store error
    #[error("Session error: {0}")]
    Session(String),

    /// Text generation service failure
    #[error("Text generation error: {0}")]
    Generation(#[from] ServiceError),
}

impl Error {
    /// Shorthand for building an [`Error::InvalidInput`]
    pub fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Whether this error is a precondition violation
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Error::InvalidInput(_))
    }
}
