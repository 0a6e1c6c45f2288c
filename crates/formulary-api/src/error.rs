//! Collaborator error types.

/// Errors returned by a [`FormulaApi`](crate::FormulaApi) backend.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Reading or writing a backing file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A payload or fixture file could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// The requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The backend refused the request.
    #[error("rejected: {0}")]
    Rejected(String),

    /// The backend is not reachable or not configured.
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

/// Convenience alias used throughout the api crate.
pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected(reason.into())
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable(reason.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns `true` if re-invoking the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Unavailable(_))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

impl From<toml::de::Error> for ApiError {
    fn from(e: toml::de::Error) -> Self {
        Self::Parse(e.to_string())
    }
}
