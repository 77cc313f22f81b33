mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{snapshot_of_ended, snapshot_of_started, BrokenIds, Harness, SequenceIds};
use ic_api::{InstanceState, ObjectKey, ID_ANNOTATION, INSTANCE_ID_ENV};
use ic_events::{event_types, headers, MemoryBus};
use ic_id::OsRandomSource;
use ic_instance_controller::{
    error::ControllerError,
    reconciler::{build_workload, EventFailurePolicy, ReconcileOutcome, ReconcilerConfig},
    store::{Fault, ResourceStore, StoreOp},
};
use ic_proto::instance::v1 as proto;
use ic_reconcile::ReconcileError;

fn key(name: &str) -> ObjectKey {
    ObjectKey::new("games", name)
}

async fn initialized(harness: &Harness, name: &str) -> String {
    harness.create(name).await;
    match harness.reconciler.reconcile(&key(name)).await.unwrap() {
        ReconcileOutcome::Initialized { id } => id,
        other => panic!("expected Initialized, got {other:?}"),
    }
}

async fn set_state(harness: &Harness, name: &str, state: InstanceState) {
    let mut instance = harness.instance(name).await;
    instance.status.state = Some(state);
    harness.store.update_instance(instance).await.unwrap();
}

async fn set_workload_ip(harness: &Harness, id: &str, ip: &str) {
    let mut workload = harness.store.get_workload(&key(id)).await.unwrap();
    workload.status.ip = ip.to_string();
    harness.store.update_workload(workload).await.unwrap();
}

#[tokio::test]
async fn new_instance_is_initialized_and_announced() {
    let harness = Harness::with(
        ReconcilerConfig::default(),
        Arc::new(SequenceIds::default()),
        MemoryBus::new(),
    );
    harness.create("game-7").await;

    let outcome = harness.reconciler.reconcile(&key("game-7")).await.unwrap();
    let ReconcileOutcome::Initialized { id } = outcome else {
        panic!("expected Initialized, got {outcome:?}");
    };

    let instance = harness.instance("game-7").await;
    assert_eq!(instance.status.id, id);
    assert_eq!(instance.metadata.annotations[ID_ANNOTATION], id);
    assert_eq!(instance.status.state, Some(InstanceState::Initializing));

    let workload = harness.store.get_workload(&key(&id)).await.unwrap();
    assert_eq!(workload.metadata.name, id);
    for container in &workload.spec.containers {
        assert!(container
            .env
            .iter()
            .any(|e| e.name == INSTANCE_ID_ENV && e.value == id));
    }
    let owner = workload.metadata.controller_ref().unwrap();
    assert_eq!(owner.name, "game-7");
    assert_eq!(owner.uid, instance.metadata.uid);

    let messages = harness.messages().await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].header(headers::TYPE), Some(event_types::INSTANCE_STARTED));
    assert_eq!(messages[0].key, id);
    assert_eq!(messages[0].header(headers::SUBJECT), Some(id.as_str()));

    let snapshot = snapshot_of_started(&messages[0]);
    assert_eq!(snapshot.id, id);
    assert_eq!(snapshot.name, "game-7");
    assert_eq!(snapshot.state(), proto::instance::State::Initializing);
}

#[tokio::test]
async fn workload_address_is_copied_without_event() {
    let harness = Harness::new();
    let id = initialized(&harness, "game-7").await;
    set_workload_ip(&harness, &id, "10.0.0.5").await;

    let outcome = harness.reconciler.reconcile(&key("game-7")).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::Updated { changed: true });
    assert_eq!(harness.instance("game-7").await.status.ip, "10.0.0.5");
    assert_eq!(harness.messages().await.len(), 1);

    let writes = harness.store.calls(StoreOp::UpdateInstance).await;
    let outcome = harness.reconciler.reconcile(&key("game-7")).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::Updated { changed: false });
    assert_eq!(harness.store.calls(StoreOp::UpdateInstance).await, writes);
}

#[tokio::test]
async fn empty_workload_address_is_not_written() {
    let harness = Harness::new();
    initialized(&harness, "game-7").await;
    let writes = harness.store.calls(StoreOp::UpdateInstance).await;

    let outcome = harness.reconciler.reconcile(&key("game-7")).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::Updated { changed: false });
    assert_eq!(harness.store.calls(StoreOp::UpdateInstance).await, writes);
}

#[tokio::test]
async fn vanished_workload_removes_instance_and_announces_end() {
    let harness = Harness::new();
    let id = initialized(&harness, "game-7").await;
    set_workload_ip(&harness, &id, "10.0.0.5").await;
    harness.reconciler.reconcile(&key("game-7")).await.unwrap();
    set_state(&harness, "game-7", InstanceState::Running).await;

    harness.store.delete_workload(&key(&id)).await.unwrap();
    let outcome = harness.reconciler.reconcile(&key("game-7")).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::CleanedUp);

    let err = harness.store.get_instance(&key("game-7")).await.unwrap_err();
    assert!(err.is_not_found());

    let messages = harness.messages().await;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].header(headers::TYPE), Some(event_types::INSTANCE_ENDED));

    let snapshot = snapshot_of_ended(&messages[1]);
    assert_eq!(snapshot.id, id);
    assert_eq!(snapshot.ip, "10.0.0.5");
    assert_eq!(snapshot.state(), proto::instance::State::Running);
}

#[tokio::test]
async fn workload_lost_during_startup_is_not_recreated() {
    let harness = Harness::new();
    let id = initialized(&harness, "game-7").await;
    harness.store.delete_workload(&key(&id)).await.unwrap();

    let outcome = harness.reconciler.reconcile(&key("game-7")).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::CleanedUp);
    assert!(harness.store.workloads().await.is_empty());
    assert_eq!(harness.store.instance_count().await, 0);
}

#[tokio::test]
async fn steady_state_does_nothing() {
    let harness = Harness::new();
    initialized(&harness, "game-7").await;
    set_state(&harness, "game-7", InstanceState::Running).await;
    let writes = harness.store.calls(StoreOp::UpdateInstance).await;

    let outcome = harness.reconciler.reconcile(&key("game-7")).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::Ignored);
    assert_eq!(harness.store.calls(StoreOp::UpdateInstance).await, writes);
    assert_eq!(harness.messages().await.len(), 1);
}

#[tokio::test]
async fn redelivery_after_initialize_is_harmless() {
    let harness = Harness::new();
    let id = initialized(&harness, "game-7").await;

    for _ in 0..3 {
        harness.reconciler.reconcile(&key("game-7")).await.unwrap();
    }

    assert_eq!(harness.instance("game-7").await.status.id, id);
    assert_eq!(harness.store.workloads().await.len(), 1);
    assert_eq!(harness.messages().await.len(), 1);
}

#[tokio::test]
async fn existing_identity_is_reused() {
    let harness = Harness::new();
    let mut instance = harness.create("game-7").await;
    instance
        .metadata
        .annotations
        .insert(ID_ANNOTATION.to_string(), "legacy-id".to_string());
    harness.store.update_instance(instance).await.unwrap();

    let outcome = harness.reconciler.reconcile(&key("game-7")).await.unwrap();
    assert_eq!(
        outcome,
        ReconcileOutcome::Initialized {
            id: "legacy-id".to_string()
        }
    );
    assert_eq!(harness.instance("game-7").await.status.id, "legacy-id");
    assert!(harness.store.get_workload(&key("legacy-id")).await.is_ok());
}

#[tokio::test]
async fn existing_workload_counts_as_created() {
    let harness = Harness::new();
    let mut instance = harness.create("game-7").await;
    instance.stamp_uid("legacy-id");
    let instance = harness.store.update_instance(instance).await.unwrap();
    harness
        .store
        .create_workload(build_workload(&instance, "legacy-id"))
        .await
        .unwrap();

    let outcome = harness.reconciler.reconcile(&key("game-7")).await.unwrap();
    assert!(matches!(outcome, ReconcileOutcome::Initialized { .. }));
    assert_eq!(harness.messages().await.len(), 1);
}

#[tokio::test]
async fn missing_instance_is_gone() {
    let harness = Harness::new();
    let outcome = harness.reconciler.reconcile(&key("game-404")).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::Gone);
    assert_eq!(harness.store.calls(StoreOp::GetWorkload).await, 0);
}

#[tokio::test]
async fn failed_workload_lookup_takes_no_action() {
    let harness = Harness::new();
    initialized(&harness, "game-7").await;
    harness
        .store
        .inject(
            StoreOp::GetWorkload,
            Fault::Error(ReconcileError::Unavailable("throttled".into())),
        )
        .await;
    let writes = harness.store.calls(StoreOp::UpdateInstance).await;

    let err = harness.reconciler.reconcile(&key("game-7")).await.unwrap_err();
    assert!(matches!(err, ControllerError::Store(ReconcileError::Unavailable(_))));
    assert!(err.is_transient());
    assert_eq!(harness.store.calls(StoreOp::UpdateInstance).await, writes);
    assert_eq!(harness.store.calls(StoreOp::DeleteInstance).await, 0);
}

#[tokio::test]
async fn uninitialized_instance_skips_workload_lookup() {
    let harness = Harness::new();
    harness.create("game-7").await;
    harness.reconciler.reconcile(&key("game-7")).await.unwrap();
    assert_eq!(harness.store.calls(StoreOp::GetWorkload).await, 0);
}

#[tokio::test(start_paused = true)]
async fn slow_store_call_times_out() {
    let harness = Harness::with(
        ReconcilerConfig {
            call_timeout: Duration::from_millis(50),
            ..Default::default()
        },
        Arc::new(OsRandomSource),
        MemoryBus::new(),
    );
    harness.create("game-7").await;
    harness
        .store
        .inject(StoreOp::GetInstance, Fault::Delay(Duration::from_secs(10)))
        .await;

    let err = harness.reconciler.reconcile(&key("game-7")).await.unwrap_err();
    match err {
        ControllerError::Store(ReconcileError::Timeout { resource, elapsed }) => {
            assert_eq!(resource, "games/game-7");
            assert_eq!(elapsed, Duration::from_millis(50));
        }
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn conflicting_write_aborts_initialize() {
    let harness = Harness::new();
    harness.create("game-7").await;
    harness
        .store
        .inject(
            StoreOp::UpdateInstance,
            Fault::Error(ReconcileError::Conflict("stale".into())),
        )
        .await;

    let err = harness.reconciler.reconcile(&key("game-7")).await.unwrap_err();
    assert!(err.is_transient());
    assert!(harness.store.workloads().await.is_empty());
    assert!(harness.messages().await.is_empty());

    // The retry goes through.
    let outcome = harness.reconciler.reconcile(&key("game-7")).await.unwrap();
    assert!(matches!(outcome, ReconcileOutcome::Initialized { .. }));
}

#[tokio::test]
async fn failed_workload_create_keeps_persisted_identity() {
    let harness = Harness::new();
    harness.create("game-7").await;
    harness
        .store
        .inject(
            StoreOp::CreateWorkload,
            Fault::Error(ReconcileError::Unavailable("refused".into())),
        )
        .await;

    let err = harness.reconciler.reconcile(&key("game-7")).await.unwrap_err();
    assert!(err.is_transient());

    let instance = harness.instance("game-7").await;
    assert_eq!(instance.status.state, Some(InstanceState::Initializing));
    assert!(instance.uid().is_some());
    assert!(harness.messages().await.is_empty());
}

#[tokio::test]
async fn identity_failure_writes_nothing() {
    let harness = Harness::with(
        ReconcilerConfig::default(),
        Arc::new(BrokenIds),
        MemoryBus::new(),
    );
    harness.create("game-7").await;

    let err = harness.reconciler.reconcile(&key("game-7")).await.unwrap_err();
    assert!(matches!(err, ControllerError::Identity(_)));
    assert_eq!(harness.store.calls(StoreOp::UpdateInstance).await, 0);
    assert!(harness.store.workloads().await.is_empty());
}

#[tokio::test]
async fn undelivered_event_is_dropped_by_default() {
    let harness = Harness::with(
        ReconcilerConfig::default(),
        Arc::new(OsRandomSource),
        MemoryBus::failing("broker down"),
    );
    harness.create("game-7").await;

    let outcome = harness.reconciler.reconcile(&key("game-7")).await.unwrap();
    assert!(matches!(outcome, ReconcileOutcome::Initialized { .. }));
    assert_eq!(harness.store.workloads().await.len(), 1);
}

#[tokio::test]
async fn undelivered_event_can_be_propagated() {
    let harness = Harness::with(
        ReconcilerConfig {
            event_failure_policy: EventFailurePolicy::Propagate,
            ..Default::default()
        },
        Arc::new(OsRandomSource),
        MemoryBus::failing("broker down"),
    );
    harness.create("game-7").await;

    let err = harness.reconciler.reconcile(&key("game-7")).await.unwrap_err();
    assert!(matches!(err, ControllerError::Event(_)));

    // State is never rolled back.
    let instance = harness.instance("game-7").await;
    assert_eq!(instance.status.state, Some(InstanceState::Initializing));
    assert_eq!(harness.store.workloads().await.len(), 1);
}

#[tokio::test]
async fn delete_race_is_gone_without_event() {
    let harness = Harness::new();
    let id = initialized(&harness, "game-7").await;
    harness.store.delete_workload(&key(&id)).await.unwrap();
    harness
        .store
        .inject(
            StoreOp::DeleteInstance,
            Fault::Error(ReconcileError::NotFound("instance games/game-7".into())),
        )
        .await;

    let outcome = harness.reconciler.reconcile(&key("game-7")).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::Gone);
    assert_eq!(harness.messages().await.len(), 1);
}

#[tokio::test]
async fn malformed_application_state_does_not_block_cleanup() {
    let harness = Harness::new();
    let id = initialized(&harness, "game-7").await;
    let mut instance = harness.instance("game-7").await;
    instance.status.state = Some(InstanceState::Running);
    instance.status.metadata.state = "{\"round\":".to_string();
    harness.store.update_instance(instance).await.unwrap();
    harness.store.delete_workload(&key(&id)).await.unwrap();

    let outcome = harness.reconciler.reconcile(&key("game-7")).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::CleanedUp);
    assert_eq!(harness.messages().await.len(), 1);
}
