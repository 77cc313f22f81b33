//! # ic-id
//!
//! Typed identifiers for the instance controller.
//!
//! ## Design Principles
//!
//! - IDs are system-generated; names are externally assigned labels
//! - An instance ID is assigned once and never reused
//! - IDs have a single canonical string form (lowercase hyphenated UUID)
//!   that is also a valid cluster object name, so workloads can be named
//!   after the instance that owns them
//! - IDs are typed to prevent mixing an instance ID with a message ID
//!
//! ## Generation
//!
//! Generation goes through an [`IdSource`] so that entropy failures surface
//! as [`IdError::Generation`] instead of a panic, and so tests can inject
//! deterministic sources.

mod error;
mod macros;
mod source;
mod types;

pub use error::IdError;
pub use source::{IdSource, OsRandomSource};
pub use types::*;

/// Re-export uuid for consumers that need raw UUID operations
pub use uuid::Uuid;
