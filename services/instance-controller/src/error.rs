//! Controller error type.

use ic_events::EventError;
use ic_id::IdError;
use ic_reconcile::ReconcileError;
use thiserror::Error;

/// Errors returned by a single reconciliation.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// A store call failed or timed out.
    #[error(transparent)]
    Store(#[from] ReconcileError),

    /// No unique ID could be generated for a new Instance.
    #[error("instance identity: {0}")]
    Identity(#[from] IdError),

    /// An event could not be built or delivered.
    #[error(transparent)]
    Event(#[from] EventError),
}

impl ControllerError {
    /// Returns true if a later attempt can be expected to succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ControllerError::Store(e) => e.is_transient(),
            ControllerError::Identity(e) => e.is_generation_error(),
            ControllerError::Event(e) => e.is_delivery_failure(),
        }
    }
}
