//! # ic-events
//!
//! Instance lifecycle events: construction, serialization and delivery.
//!
//! ## Design Principles
//!
//! - Events are facts about an Instance that has already been persisted;
//!   a lost event never rolls back state
//! - Payloads are protobuf messages from `cow.instance.v1`; opaque
//!   application state is transcoded into `google.protobuf.Struct` by an
//!   explicit, fallible step
//! - Every message gets a fresh ID and travels in a CloudEvents-style
//!   envelope (binary mode: attributes as headers, payload as body)
//! - Delivery is at least once from the bus's point of view and is never
//!   retried here; the caller decides what a failed send means
//!
//! ## Event Types
//!
//! - `network.cow.instance.started.v1`
//! - `network.cow.instance.ended.v1`
//! - `network.cow.instance.state-changed.v1`

mod bus;
mod emitter;
mod envelope;
mod error;
mod projection;
mod types;
pub mod value;

pub use bus::{BusMessage, Delivery, MemoryBus, MessageBus};
pub use emitter::{Emitter, EmitterConfig, PartitionKey};
pub use envelope::*;
pub use error::EventError;
pub use projection::{project_instance, proto_state};
pub use types::*;
pub use value::ValueError;
