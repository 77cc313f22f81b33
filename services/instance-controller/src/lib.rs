//! Instance controller.
//!
//! This crate primarily ships an `instance-controller` binary, but exposes a
//! library surface for integration testing and reuse.
//!
//! The controller watches Instance resources and their workloads, runs the
//! decision engine for every changed Instance and applies the chosen action:
//! assign identity and create the workload, copy the workload address back,
//! or remove an Instance whose workload is gone. Lifecycle facts are
//! published through the event emitter.

pub mod api;
pub mod bus;
pub mod config;
pub mod controller;
pub mod error;
pub mod reconciler;
pub mod state;
pub mod store;
