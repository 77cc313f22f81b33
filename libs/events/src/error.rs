//! Error types for event handling.

use ic_id::IdError;
use thiserror::Error;

use crate::value::ValueError;

/// Errors that can occur when building or delivering events.
#[derive(Debug, Error, Clone)]
pub enum EventError {
    /// Opaque application data could not be transcoded.
    #[error("malformed opaque state: {0}")]
    MalformedState(#[from] ValueError),

    /// No message ID could be generated.
    #[error("message id: {0}")]
    Identity(#[from] IdError),

    /// The envelope is missing a required attribute or is malformed.
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(String),

    /// The bus reported the message undelivered.
    #[error("failed to send {event_type}: {reason}")]
    Undelivered { event_type: String, reason: String },
}

impl EventError {
    /// Returns true if the event was built but not delivered.
    pub fn is_delivery_failure(&self) -> bool {
        matches!(self, EventError::Undelivered { .. })
    }
}
