//! Reconciliation primitives for Instances.
//!
//! This library holds the parts of the reconcile loop that do not talk to the
//! cluster store:
//!
//! - **Decision**: given an Instance and the result of looking up its
//!   workload, pick one of `Initialize`, `Update`, `Cleanup` or `Ignore`.
//! - **Errors**: the store/reconcile error taxonomy, split into transient
//!   failures (retry the key) and everything else.
//! - **Retry**: per-key failure tracking and exponential backoff used by the
//!   trigger source when it redelivers a failed key.
//!
//! # Invariants
//!
//! - Decisions are pure and deterministic given the same inputs
//! - The workload is looked up by the Instance's unique ID, never its name
//! - An Instance that has been assigned an ID is never initialized again

mod decide;
mod error;
mod retry;

pub use decide::{decide, lookup_key, Action, WorkloadLookup};
pub use error::{ReconcileError, ReconcileResult};
pub use retry::{BackoffPolicy, Retry, RetryTracker};

use std::time::Duration;

/// Default interval between full resyncs of all Instances.
pub const DEFAULT_RESYNC_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Default retry limit per key before backoff pins at its ceiling.
pub const DEFAULT_MAX_RETRIES: u32 = 8;

/// Default retry window.
pub const DEFAULT_RETRY_WINDOW: Duration = Duration::from_secs(10 * 60); // 10 minutes
