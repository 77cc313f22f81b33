//! Event type definitions.

/// All event type names as constants.
pub mod event_types {
    pub const INSTANCE_STARTED: &str = "network.cow.instance.started.v1";
    pub const INSTANCE_ENDED: &str = "network.cow.instance.ended.v1";
    pub const INSTANCE_STATE_CHANGED: &str = "network.cow.instance.state-changed.v1";
}

/// Lifecycle facts published about an Instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceEventKind {
    /// Identity assigned and workload created.
    Started,
    /// Workload gone and Instance removed.
    Ended,
    /// Application state changed.
    StateChanged,
}

impl InstanceEventKind {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Started => event_types::INSTANCE_STARTED,
            Self::Ended => event_types::INSTANCE_ENDED,
            Self::StateChanged => event_types::INSTANCE_STATE_CHANGED,
        }
    }
}
