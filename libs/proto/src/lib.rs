//! Wire messages for instance lifecycle events.
//!
//! Generated from `api/proto/cow/instance/v1/instance.proto` by `build.rs`
//! (requires `protoc` on the `PATH`).

pub mod instance {
    pub mod v1 {
        include!("gen/cow.instance.v1.rs");
    }
}
