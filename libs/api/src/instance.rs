//! Instance resource.

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::{ObjectKey, ObjectMeta, WorkloadSpec, ID_ANNOTATION};

/// Lifecycle state of an Instance.
///
/// - `Initializing`: the workload is starting; players should not connect.
/// - `Running`: initialization is complete; players can join.
/// - `Ending`: about to shut down; the workload may be killed at any point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum InstanceState {
    Initializing,
    Running,
    Ending,
}

impl InstanceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceState::Initializing => "Initializing",
            InstanceState::Running => "Running",
            InstanceState::Ending => "Ending",
        }
    }

    /// Whether moving from `self` to `next` keeps the lifecycle monotonic.
    pub fn can_transition_to(&self, next: InstanceState) -> bool {
        next >= *self
    }
}

impl std::fmt::Display for InstanceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InstanceState {
    type Err = InvalidStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Initializing" => Ok(InstanceState::Initializing),
            "Running" => Ok(InstanceState::Running),
            "Ending" => Ok(InstanceState::Ending),
            other => Err(InvalidStateError::Unknown(other.to_string())),
        }
    }
}

/// Errors raised by status mutations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidStateError {
    #[error("unknown instance state: {0:?}")]
    Unknown(String),

    #[error("state may not move backward from {from} to {to}")]
    Backward { from: InstanceState, to: InstanceState },

    #[error("state may not be cleared once set")]
    Cleared,
}

/// A player connected to an Instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    /// Application-defined player data.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Application-defined metadata on the Instance status.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceMetadata {
    /// Opaque application sub-state as raw JSON text. Empty means absent.
    #[serde(default)]
    pub state: String,

    /// Connected players, in join order.
    #[serde(default)]
    pub players: Vec<Player>,
}

impl InstanceMetadata {
    /// Insert a player, replacing an existing entry with the same id in place.
    pub fn upsert_player(&mut self, player: Player) {
        match self.players.iter_mut().find(|p| p.id == player.id) {
            Some(existing) => *existing = player,
            None => self.players.push(player),
        }
    }

    /// Remove a player by id. Returns the removed entry.
    pub fn remove_player(&mut self, id: &str) -> Option<Player> {
        let index = self.players.iter().position(|p| p.id == id)?;
        Some(self.players.remove(index))
    }

    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceSpec {
    /// Workload started for this Instance.
    pub template: WorkloadSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceStatus {
    #[serde(
        default,
        deserialize_with = "empty_state_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub state: Option<InstanceState>,

    /// Unique instance ID. Empty until initialized.
    #[serde(default)]
    pub id: String,

    /// Address of the backing workload. Empty until reported.
    #[serde(default)]
    pub ip: String,

    #[serde(default)]
    pub metadata: InstanceMetadata,
}

impl InstanceStatus {
    /// Move to `next`, refusing backward transitions.
    pub fn advance_to(&mut self, next: InstanceState) -> Result<(), InvalidStateError> {
        if let Some(current) = self.state {
            if !current.can_transition_to(next) {
                return Err(InvalidStateError::Backward {
                    from: current,
                    to: next,
                });
            }
        }
        self.state = Some(next);
        Ok(())
    }
}

fn empty_state_as_none<'de, D>(deserializer: D) -> Result<Option<InstanceState>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub metadata: ObjectMeta,
    pub spec: InstanceSpec,
    #[serde(default)]
    pub status: InstanceStatus,
}

impl Instance {
    /// A freshly created Instance: only the spec is populated.
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        template: WorkloadSpec,
    ) -> Self {
        Self {
            metadata: ObjectMeta::new(namespace, name),
            spec: InstanceSpec { template },
            status: InstanceStatus::default(),
        }
    }

    pub fn key(&self) -> ObjectKey {
        self.metadata.key()
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// The unique ID, preferring `status.id` over the identity annotation.
    pub fn uid(&self) -> Option<&str> {
        if !self.status.id.is_empty() {
            return Some(&self.status.id);
        }
        self.metadata
            .annotations
            .get(ID_ANNOTATION)
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Record the unique ID on both the status and the identity annotation.
    pub fn stamp_uid(&mut self, id: &str) {
        self.status.id = id.to_string();
        self.metadata
            .annotations
            .insert(ID_ANNOTATION.to_string(), id.to_string());
    }
}
