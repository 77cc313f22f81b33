//! Reconciliation errors.

use std::time::Duration;

use thiserror::Error;

/// Result type for store and reconcile operations.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Reconciliation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReconcileError {
    /// A store call did not answer within its deadline.
    #[error("timeout after {elapsed:?} waiting for {resource}")]
    Timeout {
        resource: String,
        elapsed: Duration,
    },

    /// Resource not found.
    #[error("resource not found: {0}")]
    NotFound(String),

    /// Resource already exists.
    #[error("resource already exists: {0}")]
    AlreadyExists(String),

    /// Conflict detected (stale resource version).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The store could not be reached or is throttling.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store rejected the object.
    #[error("invalid object: {0}")]
    Invalid(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ReconcileError {
    /// Returns true for failures that a later attempt can be expected to clear.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::Conflict(_) | Self::Unavailable(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ReconcileError::Conflict("v1".into()).is_transient());
        assert!(ReconcileError::Unavailable("refused".into()).is_transient());
        assert!(ReconcileError::Timeout {
            resource: "games/game-7".into(),
            elapsed: Duration::from_secs(5),
        }
        .is_transient());

        assert!(!ReconcileError::NotFound("x".into()).is_transient());
        assert!(!ReconcileError::Invalid("x".into()).is_transient());
    }

    #[test]
    fn test_timeout_message() {
        let err = ReconcileError::Timeout {
            resource: "games/game-7".into(),
            elapsed: Duration::from_millis(1500),
        };
        assert_eq!(err.to_string(), "timeout after 1.5s waiting for games/game-7");
    }
}
