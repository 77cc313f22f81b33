//! The decision engine.

use ic_api::{Instance, InstanceState, ObjectKey, Workload};

use crate::ReconcileError;

/// What the controller should do with an Instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Assign identity, mark `Initializing`, create the workload.
    Initialize,

    /// Sync observed workload data (the address) into the Instance status.
    Update,

    /// The workload is gone; remove the Instance.
    Cleanup,

    /// Steady state.
    Ignore,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Initialize => "initialize",
            Action::Update => "update",
            Action::Cleanup => "cleanup",
            Action::Ignore => "ignore",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of fetching an Instance's workload.
#[derive(Debug, Clone)]
pub enum WorkloadLookup {
    Found(Workload),
    NotFound,
    Failed(ReconcileError),
}

impl WorkloadLookup {
    /// Classify a store answer. `NotFound` becomes a decision input rather
    /// than an error.
    pub fn from_result(result: Result<Workload, ReconcileError>) -> Self {
        match result {
            Ok(workload) => Self::Found(workload),
            Err(e) if e.is_not_found() => Self::NotFound,
            Err(e) => Self::Failed(e),
        }
    }
}

/// Key of the workload correlated with `instance`: its unique ID in the
/// Instance's namespace. `None` if no ID has been assigned.
pub fn lookup_key(instance: &Instance) -> Option<ObjectKey> {
    instance
        .uid()
        .map(|id| ObjectKey::new(&instance.metadata.namespace, id))
}

/// Decide what to do with `instance` given its workload lookup.
///
/// Rules, first match wins:
///
/// 1. no `status.state` → [`Action::Initialize`], whatever the lookup says
/// 2. workload not found → [`Action::Cleanup`]
/// 3. lookup failed → the error; the caller must not act
/// 4. `Initializing` → [`Action::Update`]
/// 5. otherwise → [`Action::Ignore`]
pub fn decide(instance: &Instance, lookup: &WorkloadLookup) -> Result<Action, ReconcileError> {
    let Some(state) = instance.status.state else {
        return Ok(Action::Initialize);
    };

    match lookup {
        WorkloadLookup::NotFound => Ok(Action::Cleanup),
        WorkloadLookup::Failed(e) => Err(e.clone()),
        WorkloadLookup::Found(_) if state == InstanceState::Initializing => Ok(Action::Update),
        WorkloadLookup::Found(_) => Ok(Action::Ignore),
    }
}
