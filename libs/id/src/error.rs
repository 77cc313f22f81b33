//! Error types for ID parsing and generation.

use thiserror::Error;

/// Errors that can occur when parsing or generating IDs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The ID string is empty.
    #[error("ID cannot be empty")]
    Empty,

    /// The ID is not a canonical UUID.
    #[error("invalid UUID: {0}")]
    InvalidUuid(String),

    /// The ID is a UUID but not in canonical lowercase hyphenated form.
    #[error("ID is not in canonical form: {0}")]
    NotCanonical(String),

    /// The entropy source failed.
    #[error("ID generation failed: {0}")]
    Generation(String),
}

impl IdError {
    /// Returns true if this error indicates the input was empty.
    pub fn is_empty(&self) -> bool {
        matches!(self, IdError::Empty)
    }

    /// Returns true if this error came from the entropy source.
    pub fn is_generation_error(&self) -> bool {
        matches!(self, IdError::Generation(_))
    }
}
