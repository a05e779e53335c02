//! Error types for memory operations.

/// Errors returned by memory stores and helpers.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Rejected record (empty content or key).
    #[error("invalid memory record: {0}")]
    InvalidRecord(String),
    /// Backend could not serve the request.
    #[error("memory store unavailable: {0}")]
    Unavailable(String),
}
