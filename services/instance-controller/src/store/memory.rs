//! In-memory resource store for development and testing.

use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use ic_api::{Instance, ObjectKey, ObjectMeta, Workload};
use ic_reconcile::{ReconcileError, ReconcileResult};
use tokio::sync::{broadcast, Mutex};
use tracing::debug;

use super::{ChangeKind, ResourceStore, WatchEvent};

const WATCH_CAPACITY: usize = 1024;

/// Store operations that can be observed or faulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StoreOp {
    GetInstance,
    ListInstances,
    CreateInstance,
    UpdateInstance,
    DeleteInstance,
    GetWorkload,
    CreateWorkload,
    UpdateWorkload,
    DeleteWorkload,
}

/// A one-shot fault consumed by the next call of an operation.
#[derive(Debug, Clone)]
pub enum Fault {
    /// Fail the call with this error.
    Error(ReconcileError),

    /// Stall the call before it touches any data.
    Delay(Duration),
}

#[derive(Debug, Default)]
struct Inner {
    instances: BTreeMap<ObjectKey, Instance>,
    workloads: BTreeMap<ObjectKey, Workload>,
    version: u64,
    next_uid: u64,
    faults: BTreeMap<StoreOp, VecDeque<Fault>>,
    calls: BTreeMap<StoreOp, usize>,
}

impl Inner {
    fn next_version(&mut self) -> u64 {
        self.version += 1;
        self.version
    }

    fn assign_uid(&mut self, meta: &mut ObjectMeta) {
        self.next_uid += 1;
        meta.uid = format!("{:012x}", self.next_uid);
    }
}

/// Resource store backed by in-process maps.
///
/// Mirrors the cluster store's semantics closely enough for the controller:
/// store-assigned uids, optimistic concurrency on `resource_version`,
/// cascading deletion of controlled workloads and change notifications.
pub struct MemoryStore {
    inner: Mutex<Inner>,
    events: broadcast::Sender<WatchEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(WATCH_CAPACITY);
        Self {
            inner: Mutex::new(Inner::default()),
            events,
        }
    }

    /// Queue a fault for the next call of `op`.
    pub async fn inject(&self, op: StoreOp, fault: Fault) {
        self.inner
            .lock()
            .await
            .faults
            .entry(op)
            .or_default()
            .push_back(fault);
    }

    /// Number of calls made to `op` so far.
    pub async fn calls(&self, op: StoreOp) -> usize {
        self.inner.lock().await.calls.get(&op).copied().unwrap_or(0)
    }

    pub async fn instance_count(&self) -> usize {
        self.inner.lock().await.instances.len()
    }

    pub async fn workloads(&self) -> Vec<Workload> {
        self.inner.lock().await.workloads.values().cloned().collect()
    }

    async fn enter(&self, op: StoreOp) -> ReconcileResult<()> {
        let fault = {
            let mut inner = self.inner.lock().await;
            *inner.calls.entry(op).or_default() += 1;
            inner.faults.get_mut(&op).and_then(VecDeque::pop_front)
        };

        match fault {
            None => Ok(()),
            Some(Fault::Error(e)) => Err(e),
            Some(Fault::Delay(delay)) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
        }
    }

    fn notify(&self, event: WatchEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceStore for MemoryStore {
    async fn get_instance(&self, key: &ObjectKey) -> ReconcileResult<Instance> {
        self.enter(StoreOp::GetInstance).await?;
        self.inner
            .lock()
            .await
            .instances
            .get(key)
            .cloned()
            .ok_or_else(|| ReconcileError::NotFound(format!("instance {key}")))
    }

    async fn list_instances(&self) -> ReconcileResult<Vec<Instance>> {
        self.enter(StoreOp::ListInstances).await?;
        Ok(self.inner.lock().await.instances.values().cloned().collect())
    }

    async fn create_instance(&self, mut instance: Instance) -> ReconcileResult<Instance> {
        self.enter(StoreOp::CreateInstance).await?;
        if instance.metadata.name.is_empty() {
            return Err(ReconcileError::Invalid("instance name is required".to_string()));
        }

        let key = instance.key();
        let created = {
            let mut inner = self.inner.lock().await;
            if inner.instances.contains_key(&key) {
                return Err(ReconcileError::AlreadyExists(format!("instance {key}")));
            }
            inner.assign_uid(&mut instance.metadata);
            instance.metadata.resource_version = inner.next_version();
            inner.instances.insert(key.clone(), instance.clone());
            instance
        };

        debug!(key = %key, "[MEMORY] Instance created");
        self.notify(WatchEvent::Instance {
            kind: ChangeKind::Added,
            key,
        });
        Ok(created)
    }

    async fn update_instance(&self, mut instance: Instance) -> ReconcileResult<Instance> {
        self.enter(StoreOp::UpdateInstance).await?;
        let key = instance.key();
        let updated = {
            let mut inner = self.inner.lock().await;
            let stored = inner
                .instances
                .get(&key)
                .ok_or_else(|| ReconcileError::NotFound(format!("instance {key}")))?;
            if stored.metadata.resource_version != instance.metadata.resource_version {
                return Err(ReconcileError::Conflict(format!(
                    "instance {key}: resource version {} is stale (current {})",
                    instance.metadata.resource_version, stored.metadata.resource_version
                )));
            }
            instance.metadata.uid = stored.metadata.uid.clone();
            instance.metadata.resource_version = inner.next_version();
            inner.instances.insert(key.clone(), instance.clone());
            instance
        };

        self.notify(WatchEvent::Instance {
            kind: ChangeKind::Modified,
            key,
        });
        Ok(updated)
    }

    async fn delete_instance(&self, key: &ObjectKey) -> ReconcileResult<()> {
        self.enter(StoreOp::DeleteInstance).await?;
        let orphaned = {
            let mut inner = self.inner.lock().await;
            let removed = inner
                .instances
                .remove(key)
                .ok_or_else(|| ReconcileError::NotFound(format!("instance {key}")))?;

            let owned: Vec<ObjectKey> = inner
                .workloads
                .iter()
                .filter(|(_, w)| {
                    w.metadata
                        .controller_ref()
                        .is_some_and(|r| r.uid == removed.metadata.uid)
                })
                .map(|(k, _)| k.clone())
                .collect();
            owned
                .iter()
                .filter_map(|k| inner.workloads.remove(k))
                .collect::<Vec<_>>()
        };

        debug!(key = %key, cascaded = orphaned.len(), "[MEMORY] Instance deleted");
        self.notify(WatchEvent::Instance {
            kind: ChangeKind::Deleted,
            key: key.clone(),
        });
        for workload in &orphaned {
            self.notify(WatchEvent::for_workload(ChangeKind::Deleted, workload));
        }
        Ok(())
    }

    async fn get_workload(&self, key: &ObjectKey) -> ReconcileResult<Workload> {
        self.enter(StoreOp::GetWorkload).await?;
        self.inner
            .lock()
            .await
            .workloads
            .get(key)
            .cloned()
            .ok_or_else(|| ReconcileError::NotFound(format!("workload {key}")))
    }

    async fn create_workload(&self, mut workload: Workload) -> ReconcileResult<Workload> {
        self.enter(StoreOp::CreateWorkload).await?;
        if workload.metadata.name.is_empty() {
            return Err(ReconcileError::Invalid("workload name is required".to_string()));
        }

        let key = workload.metadata.key();
        let created = {
            let mut inner = self.inner.lock().await;
            if inner.workloads.contains_key(&key) {
                return Err(ReconcileError::AlreadyExists(format!("workload {key}")));
            }
            inner.assign_uid(&mut workload.metadata);
            workload.metadata.resource_version = inner.next_version();
            inner.workloads.insert(key.clone(), workload.clone());
            workload
        };

        debug!(key = %key, "[MEMORY] Workload created");
        self.notify(WatchEvent::for_workload(ChangeKind::Added, &created));
        Ok(created)
    }

    async fn update_workload(&self, mut workload: Workload) -> ReconcileResult<Workload> {
        self.enter(StoreOp::UpdateWorkload).await?;
        let key = workload.metadata.key();
        let updated = {
            let mut inner = self.inner.lock().await;
            let stored = inner
                .workloads
                .get(&key)
                .ok_or_else(|| ReconcileError::NotFound(format!("workload {key}")))?;
            if stored.metadata.resource_version != workload.metadata.resource_version {
                return Err(ReconcileError::Conflict(format!(
                    "workload {key}: resource version {} is stale (current {})",
                    workload.metadata.resource_version, stored.metadata.resource_version
                )));
            }
            workload.metadata.uid = stored.metadata.uid.clone();
            workload.metadata.resource_version = inner.next_version();
            inner.workloads.insert(key, workload.clone());
            workload
        };

        self.notify(WatchEvent::for_workload(ChangeKind::Modified, &updated));
        Ok(updated)
    }

    async fn delete_workload(&self, key: &ObjectKey) -> ReconcileResult<()> {
        self.enter(StoreOp::DeleteWorkload).await?;
        let removed = self
            .inner
            .lock()
            .await
            .workloads
            .remove(key)
            .ok_or_else(|| ReconcileError::NotFound(format!("workload {key}")))?;

        debug!(key = %key, "[MEMORY] Workload deleted");
        self.notify(WatchEvent::for_workload(ChangeKind::Deleted, &removed));
        Ok(())
    }

    fn watch(&self) -> broadcast::Receiver<WatchEvent> {
        self.events.subscribe()
    }
}
