//! Errors raised by the gateway and bus collaborators.

use thiserror::Error;

/// Result type for collaborator operations.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Error type for gateway and bus calls.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Adapter configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Other error
    #[error("Adapter error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<std::io::Error> for AdapterError {
    fn from(e: std::io::Error) -> Self {
        AdapterError::Communication(e.to_string())
    }
}
