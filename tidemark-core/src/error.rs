//! Error types for tidemark-core

use thiserror::Error;

/// Main error type for the tidemark-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Delivery/backend API error
    #[error("delivery error: {0}")]
    Delivery(String),

    /// Invalid capture input (e.g., missing required space id)
    #[error("capture error: {0}")]
    Capture(String),

    /// Relevance scoring error from the external embedding primitive
    #[error("scoring error: {0}")]
    Scoring(String),

    /// Queued capture not found
    #[error("queued capture not found: {0}")]
    CaptureNotFound(String),
}

/// Result type alias for tidemark-core
pub type Result<T> = std::result::Result<T, Error>;
