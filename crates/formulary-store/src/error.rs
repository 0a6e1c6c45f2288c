//! Persistence error types.

/// Errors that can occur while reading or writing the recoverable draft slot.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// The slot file could not be read or written.
    #[error("draft storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The slot contents were not a valid draft.
    #[error("draft serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The slot is held by another process.
    #[error("draft storage locked: {0}")]
    Locked(String),

    /// Catch-all for unexpected backend failures.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience alias used throughout the store crate.
pub type Result<T> = std::result::Result<T, PersistenceError>;

impl PersistenceError {
    /// Creates a [`PersistenceError::Internal`] with the given message.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns `true` if the error is transient and a later write may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Locked(_) | Self::Io(_))
    }
}
