//! Common error types for Pilah

use thiserror::Error;

/// Common result type for Pilah operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across Pilah services
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Stored JSON document could not be read or written
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
