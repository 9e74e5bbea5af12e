use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("duplicate key: {0}")]
    Duplicate(String),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Failure of the reputation capability. Always recoverable: the caller queues
/// the adjustment and retries later.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReputationError {
    #[error("identity directory unavailable: {0}")]
    Unavailable(String),

    #[error("unknown agent: {0}")]
    UnknownAgent(String),
}
