//! Instance reconciler.
//!
//! One call to [`InstanceReconciler::reconcile`] observes an Instance and its
//! workload, asks the decision engine what to do and performs that action.
//! Every step is safe to repeat: a key may be redelivered any number of times.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use ic_api::{
    EnvVar, Instance, InstanceState, ObjectKey, ObjectMeta, OwnerReference, Workload,
    WorkloadStatus, GROUP_VERSION, INSTANCE_ID_ENV, INSTANCE_KIND,
};
use ic_events::{Emitter, EventError};
use ic_id::{IdSource, InstanceUid, MessageId};
use ic_reconcile::{decide, lookup_key, Action, ReconcileError, ReconcileResult, WorkloadLookup};
use tracing::{debug, info, instrument, warn};

use crate::error::ControllerError;
use crate::store::ResourceStore;

/// What to do when an event cannot be built or delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EventFailurePolicy {
    /// Log the failure and report the reconciliation as successful.
    #[default]
    LogAndDrop,

    /// Return the failure to the caller. Persisted state is kept either way.
    Propagate,
}

/// Reconciler configuration.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Deadline for each individual store call.
    pub call_timeout: Duration,

    pub event_failure_policy: EventFailurePolicy,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(5),
            event_failure_policy: EventFailurePolicy::default(),
        }
    }
}

/// Result of one reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Identity assigned, workload created.
    Initialized { id: String },

    /// Workload address synced. `changed` is false when there was nothing
    /// to write.
    Updated { changed: bool },

    /// Workload gone, Instance removed.
    CleanedUp,

    /// Steady state.
    Ignored,

    /// The Instance no longer exists.
    Gone,
}

/// Drives a single Instance towards its desired state.
pub struct InstanceReconciler {
    store: Arc<dyn ResourceStore>,
    emitter: Arc<Emitter>,
    ids: Arc<dyn IdSource>,
    config: ReconcilerConfig,
}

impl InstanceReconciler {
    pub fn new(
        store: Arc<dyn ResourceStore>,
        emitter: Arc<Emitter>,
        ids: Arc<dyn IdSource>,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            store,
            emitter,
            ids,
            config,
        }
    }

    /// Reconcile the Instance at `key`.
    #[instrument(skip(self), fields(namespace = %key.namespace, instance_name = %key.name))]
    pub async fn reconcile(&self, key: &ObjectKey) -> Result<ReconcileOutcome, ControllerError> {
        let instance = match self.call(key, self.store.get_instance(key)).await {
            Ok(instance) => instance,
            Err(e) if e.is_not_found() => {
                debug!("Instance no longer exists");
                return Ok(ReconcileOutcome::Gone);
            }
            Err(e) => return Err(e.into()),
        };

        let lookup = match lookup_key(&instance) {
            Some(workload_key) => WorkloadLookup::from_result(
                self.call(&workload_key, self.store.get_workload(&workload_key))
                    .await,
            ),
            None => WorkloadLookup::NotFound,
        };

        let action = decide(&instance, &lookup)?;
        debug!(action = %action, state = ?instance.status.state, "Decided action");

        match action {
            Action::Initialize => self.initialize(instance).await,
            Action::Update => match lookup {
                WorkloadLookup::Found(workload) => self.update(instance, &workload.status).await,
                _ => Ok(ReconcileOutcome::Ignored),
            },
            Action::Cleanup => self.cleanup(instance).await,
            Action::Ignore => Ok(ReconcileOutcome::Ignored),
        }
    }

    async fn initialize(
        &self,
        mut instance: Instance,
    ) -> Result<ReconcileOutcome, ControllerError> {
        let id = match instance.uid() {
            Some(existing) => existing.to_string(),
            None => InstanceUid::generate(self.ids.as_ref())?.to_string(),
        };
        instance.stamp_uid(&id);
        instance.status.state = Some(InstanceState::Initializing);

        let key = instance.key();
        let instance = self.call(&key, self.store.update_instance(instance)).await?;
        info!(instance_id = %id, "Instance identity assigned");

        let workload = build_workload(&instance, &id);
        let workload_key = workload.metadata.key();
        match self
            .call(&workload_key, self.store.create_workload(workload))
            .await
        {
            Ok(_) => info!(instance_id = %id, "Workload created"),
            Err(e) if e.is_already_exists() => {
                debug!(instance_id = %id, "Workload already exists")
            }
            Err(e) => return Err(e.into()),
        }

        self.settle(self.emitter.instance_created(&instance).await)?;
        Ok(ReconcileOutcome::Initialized { id })
    }

    async fn update(
        &self,
        mut instance: Instance,
        observed: &WorkloadStatus,
    ) -> Result<ReconcileOutcome, ControllerError> {
        if observed.ip.is_empty() || observed.ip == instance.status.ip {
            return Ok(ReconcileOutcome::Updated { changed: false });
        }

        instance.status.ip = observed.ip.clone();
        let key = instance.key();
        self.call(&key, self.store.update_instance(instance)).await?;
        info!(ip = %observed.ip, "Instance address updated");
        Ok(ReconcileOutcome::Updated { changed: true })
    }

    async fn cleanup(&self, instance: Instance) -> Result<ReconcileOutcome, ControllerError> {
        if instance.status.state == Some(InstanceState::Initializing) {
            warn!(
                instance_id = instance.uid().unwrap_or_default(),
                "Workload lost before the Instance left Initializing; removing the Instance"
            );
        }

        let key = instance.key();
        match self.call(&key, self.store.delete_instance(&key)).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                debug!("Instance already removed");
                return Ok(ReconcileOutcome::Gone);
            }
            Err(e) => return Err(e.into()),
        }
        info!(
            instance_id = instance.uid().unwrap_or_default(),
            "Instance removed after its workload disappeared"
        );

        self.settle(self.emitter.instance_ended(&instance).await)?;
        Ok(ReconcileOutcome::CleanedUp)
    }

    /// Bound a store call by the per-call deadline.
    async fn call<T>(
        &self,
        resource: &ObjectKey,
        fut: impl Future<Output = ReconcileResult<T>>,
    ) -> ReconcileResult<T> {
        tokio::time::timeout(self.config.call_timeout, fut)
            .await
            .unwrap_or_else(|_| {
                Err(ReconcileError::Timeout {
                    resource: resource.to_string(),
                    elapsed: self.config.call_timeout,
                })
            })
    }

    fn settle(&self, sent: Result<MessageId, EventError>) -> Result<(), ControllerError> {
        match (sent, self.config.event_failure_policy) {
            (Ok(_), _) => Ok(()),
            (Err(e), EventFailurePolicy::LogAndDrop) => {
                warn!(error = %e, "Dropping instance event");
                Ok(())
            }
            (Err(e), EventFailurePolicy::Propagate) => Err(e.into()),
        }
    }
}

/// Build the workload backing `instance`.
///
/// The workload is named after the unique ID, carries a copy of the
/// Instance's template with `INSTANCE_ID` injected into every container,
/// the Instance's labels and annotations, and a controller owner reference
/// back to the Instance.
pub fn build_workload(instance: &Instance, id: &str) -> Workload {
    let mut spec = instance.spec.template.clone();
    for container in &mut spec.containers {
        container.env.push(EnvVar::new(INSTANCE_ID_ENV, id));
    }

    let mut metadata = ObjectMeta::new(&instance.metadata.namespace, id);
    metadata.labels = instance.metadata.labels.clone();
    metadata.annotations = instance.metadata.annotations.clone();
    metadata.owner_references.push(OwnerReference {
        api_version: GROUP_VERSION.to_string(),
        kind: INSTANCE_KIND.to_string(),
        name: instance.name().to_string(),
        uid: instance.metadata.uid.clone(),
        controller: true,
        block_owner_deletion: true,
    });

    Workload {
        metadata,
        spec,
        status: WorkloadStatus::default(),
    }
}
