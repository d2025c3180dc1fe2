//! Error types for sqlscribe

use thiserror::Error;

/// Core error type shared by drivers, the catalog reader and the agent toolkit
#[derive(Error, Debug)]
pub enum ScribeError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for sqlscribe operations
pub type Result<T> = std::result::Result<T, ScribeError>;
