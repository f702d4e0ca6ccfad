//! Client error taxonomy.

use thiserror::Error;

/// Errors surfaced by the backing-system clients.
///
/// The distinction that matters to callers is conflict vs. transient:
/// conflicts are never retried automatically, transient failures may be.
#[derive(Debug, Error)]
pub enum ClientError {
    /// A unique name is already taken (e.g. duplicate identity).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The referenced entity does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A storage constraint was violated.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// The service is unreachable or timed out; retryable by the caller.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Login or token was rejected.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// Returns true if the failure is transient and a caller-side retry
    /// could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ClientError::Unavailable(_))
    }

    /// Returns true if the failure is a uniqueness conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, ClientError::Conflict(_))
    }
}

/// Convenience type alias for client results.
pub type Result<T> = std::result::Result<T, ClientError>;
