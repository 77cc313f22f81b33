#![allow(dead_code)]

use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ic_api::{Container, ContainerPort, Instance, ObjectKey, WorkloadSpec};
use ic_events::{BusMessage, Emitter, EmitterConfig, MemoryBus};
use ic_id::{IdError, IdSource, OsRandomSource};
use ic_instance_controller::{
    reconciler::{InstanceReconciler, ReconcilerConfig},
    store::{MemoryStore, ResourceStore},
};
use ic_proto::instance::v1 as proto;
use prost::Message;

/// Deterministic IDs: every byte of the n-th ID is `n`.
#[derive(Default)]
pub struct SequenceIds {
    next: AtomicU8,
}

impl IdSource for SequenceIds {
    fn random_bytes(&self) -> Result<[u8; 16], IdError> {
        let n = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        Ok([n; 16])
    }
}

/// An entropy source that always fails.
pub struct BrokenIds;

impl IdSource for BrokenIds {
    fn random_bytes(&self) -> Result<[u8; 16], IdError> {
        Err(IdError::Generation("entropy pool unavailable".to_string()))
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub bus: Arc<MemoryBus>,
    pub emitter: Arc<Emitter>,
    pub reconciler: Arc<InstanceReconciler>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(ReconcilerConfig::default(), Arc::new(OsRandomSource), MemoryBus::new())
    }

    pub fn with(config: ReconcilerConfig, ids: Arc<dyn IdSource>, bus: MemoryBus) -> Self {
        let store = Arc::new(MemoryStore::new());
        let bus = Arc::new(bus);
        let emitter = Arc::new(Emitter::new(
            bus.clone(),
            Arc::new(OsRandomSource),
            EmitterConfig::default(),
        ));
        let reconciler = Arc::new(InstanceReconciler::new(
            store.clone(),
            emitter.clone(),
            ids,
            config,
        ));
        Self {
            store,
            bus,
            emitter,
            reconciler,
        }
    }

    /// Persist a fresh Instance, as an external actor would.
    pub async fn create(&self, name: &str) -> Instance {
        self.store
            .create_instance(Instance::new("games", name, template()))
            .await
            .unwrap()
    }

    pub async fn instance(&self, name: &str) -> Instance {
        self.store
            .get_instance(&ObjectKey::new("games", name))
            .await
            .unwrap()
    }

    pub async fn messages(&self) -> Vec<BusMessage> {
        self.bus.messages().await
    }
}

pub fn template() -> WorkloadSpec {
    WorkloadSpec {
        containers: vec![
            Container {
                name: "server".to_string(),
                image: "registry.cow.network/bedwars:1.4".to_string(),
                ports: vec![ContainerPort {
                    name: Some("game".to_string()),
                    container_port: 25565,
                    protocol: "TCP".to_string(),
                }],
                ..Default::default()
            },
            Container {
                name: "metrics".to_string(),
                image: "registry.cow.network/exporter:2".to_string(),
                ..Default::default()
            },
        ],
        ..Default::default()
    }
}

pub fn snapshot_of_started(message: &BusMessage) -> proto::Instance {
    proto::InstanceStartedEvent::decode(message.payload.clone())
        .unwrap()
        .instance
        .unwrap()
}

pub fn snapshot_of_ended(message: &BusMessage) -> proto::Instance {
    proto::InstanceEndedEvent::decode(message.payload.clone())
        .unwrap()
        .instance
        .unwrap()
}

/// Poll `check` until it holds or five seconds pass.
pub async fn eventually<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if check().await {
            return;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {what}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
