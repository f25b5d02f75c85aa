//! Error types for cache operations

use thiserror::Error;

/// Main error type for all cache operations
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// Insert on a key that already exists in the remote tier
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// Value could not be encoded by the configured serializer
    #[error("value is not serializable: {0}")]
    NotSerializable(String),

    /// Deserialization failed
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Transport or connection failure talking to the remote tier
    #[error("remote store unavailable: {0}")]
    RemoteUnavailable(String),

    /// Operation is not supported by the configured cache mode
    #[error("unsupported operation: {0}")]
    UnsupportedCapability(String),

    /// Configuration rejected at construction time
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Key holds a value of a different kind (e.g. a set opened as a list)
    #[error("wrong type for key: {0}")]
    WrongType(String),

    /// Command rejected by the remote store
    #[error("backend error: {0}")]
    Backend(String),

    /// Cache instance was closed
    #[error("cache is closed")]
    Closed,

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Whether the error came from the transport rather than from the data
    pub fn is_unavailable(&self) -> bool {
        matches!(self, CacheError::RemoteUnavailable(_))
    }
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;
