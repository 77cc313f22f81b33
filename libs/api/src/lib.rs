//! # ic-api
//!
//! Resource schema shared by the controller, the decision engine and the
//! event pipeline.
//!
//! Two kinds of resources live in the cluster store:
//!
//! - [`Instance`]: created by an external actor with only `spec` populated.
//!   The controller owns `status.id` and the early part of `status.state`;
//!   the running application owns the rest of `status`.
//! - [`Workload`]: the executable unit backing an Instance. It is named after
//!   the Instance's unique ID and carries a controller owner reference back
//!   to the Instance.
//!
//! The JSON form follows cluster conventions (camelCase, empty collections
//! omitted).

mod instance;
mod meta;
mod workload;

pub use instance::*;
pub use meta::*;
pub use workload::*;

/// API group/version of the Instance resource.
pub const GROUP_VERSION: &str = "instance.cow.network/v1";

/// Kind of the Instance resource.
pub const INSTANCE_KIND: &str = "Instance";

/// Kind of the workload resource.
pub const WORKLOAD_KIND: &str = "Workload";

/// Annotation carrying the unique instance ID on both the Instance and its
/// workload.
pub const ID_ANNOTATION: &str = "instance.cow.network/id";

/// Environment entry injected into every workload container so the process
/// can identify itself.
pub const INSTANCE_ID_ENV: &str = "INSTANCE_ID";
