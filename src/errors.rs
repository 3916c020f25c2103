//! Error types for the LexVault engine
//!
//! Every fallible operation in the crate returns the typed [`EngineError`]
//! so callers can tell recoverable provider failures apart from
//! misconfiguration.

use thiserror::Error;

/// Main error type for the knowledge engine
#[derive(Error, Debug)]
pub enum EngineError {
    /// Document could not be parsed into text
    #[error("Parse error: {0}")]
    Parse(String),

    /// Embedding provider failure (transient, retryable)
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Vector store failure (upsert, query or maintenance)
    #[error("Vector store error: {0}")]
    VectorStore(String),

    /// Rerank provider failure (recoverable via similarity fallback)
    #[error("Rerank error: {0}")]
    Rerank(String),

    /// Invalid or inconsistent configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unrecognized confidentiality tier label
    #[error("Unknown tier: {0}")]
    UnknownTier(String),

    /// Unrecognized knowledge collection name
    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    /// Caller access level outside the supported range
    #[error("Access level {value} outside supported range 0..=3")]
    InvalidAccessLevel { value: u8 },

    /// Operation exceeded its deadline
    #[error("Operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
