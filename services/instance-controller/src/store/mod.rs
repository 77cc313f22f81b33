//! Cluster resource store interface.
//!
//! The controller reads and writes two kinds of resources:
//! - Instances, keyed by namespace and name
//! - Workloads, keyed by namespace and the owning Instance's unique ID
//!
//! Every write is a full-object replace guarded by `resource_version`.
//! Change notifications are fanned out on a broadcast channel.

mod memory;

pub use memory::{Fault, MemoryStore, StoreOp};

use async_trait::async_trait;
use ic_api::{Instance, ObjectKey, Workload, INSTANCE_KIND};
use ic_reconcile::ReconcileResult;
use tokio::sync::broadcast;

/// Kind of change reported by a watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

/// A change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Instance {
        kind: ChangeKind,
        key: ObjectKey,
    },
    Workload {
        kind: ChangeKind,
        key: ObjectKey,
        /// Instance that controls the workload, if any.
        owner: Option<ObjectKey>,
    },
}

impl WatchEvent {
    pub(crate) fn for_workload(kind: ChangeKind, workload: &Workload) -> Self {
        let owner = workload
            .metadata
            .controller_ref()
            .filter(|r| r.kind == INSTANCE_KIND)
            .map(|r| ObjectKey::new(&workload.metadata.namespace, &r.name));
        WatchEvent::Workload {
            kind,
            key: workload.metadata.key(),
            owner,
        }
    }

    /// The Instance that should be reconciled in response to this change.
    pub fn instance_key(&self) -> Option<&ObjectKey> {
        match self {
            WatchEvent::Instance { key, .. } => Some(key),
            WatchEvent::Workload { owner, .. } => owner.as_ref(),
        }
    }
}

/// Cluster resource store.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn get_instance(&self, key: &ObjectKey) -> ReconcileResult<Instance>;

    /// All Instances in all namespaces.
    async fn list_instances(&self) -> ReconcileResult<Vec<Instance>>;

    /// Persist a new Instance. The store assigns `uid` and `resource_version`.
    async fn create_instance(&self, instance: Instance) -> ReconcileResult<Instance>;

    /// Replace an Instance. Fails with `Conflict` if `resource_version` is stale.
    async fn update_instance(&self, instance: Instance) -> ReconcileResult<Instance>;

    /// Delete an Instance and, eventually, the workloads it controls.
    async fn delete_instance(&self, key: &ObjectKey) -> ReconcileResult<()>;

    async fn get_workload(&self, key: &ObjectKey) -> ReconcileResult<Workload>;

    async fn create_workload(&self, workload: Workload) -> ReconcileResult<Workload>;

    async fn update_workload(&self, workload: Workload) -> ReconcileResult<Workload>;

    async fn delete_workload(&self, key: &ObjectKey) -> ReconcileResult<()>;

    /// Subscribe to change notifications.
    fn watch(&self) -> broadcast::Receiver<WatchEvent>;
}
