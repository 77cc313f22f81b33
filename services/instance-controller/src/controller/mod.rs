//! Controller loop.
//!
//! Runs the pieces that feed and drain the work queue:
//! - a watch forwarder mapping store notifications to Instance keys
//! - a periodic resync enqueueing every Instance
//! - `workers` tasks reconciling one key at a time
//!
//! Failed keys are re-added with exponential backoff.

mod queue;

pub use queue::WorkQueue;

use std::sync::Arc;
use std::time::Duration;

use ic_reconcile::{
    BackoffPolicy, RetryTracker, DEFAULT_MAX_RETRIES, DEFAULT_RESYNC_INTERVAL,
    DEFAULT_RETRY_WINDOW,
};
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

use crate::reconciler::InstanceReconciler;
use crate::store::{ResourceStore, WatchEvent};

/// Controller configuration.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Number of concurrent reconcile workers.
    pub workers: usize,

    /// Interval between full resyncs.
    pub resync_interval: Duration,

    pub backoff: BackoffPolicy,

    /// Failures within `retry_window` before backoff pins at its ceiling.
    pub max_retries: u32,

    pub retry_window: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            resync_interval: DEFAULT_RESYNC_INTERVAL,
            backoff: BackoffPolicy::default(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_window: DEFAULT_RETRY_WINDOW,
        }
    }
}

/// The Instance controller.
pub struct Controller {
    reconciler: Arc<InstanceReconciler>,
    store: Arc<dyn ResourceStore>,
    queue: Arc<WorkQueue>,
    retries: Mutex<RetryTracker>,
    config: ControllerConfig,
}

impl Controller {
    pub fn new(
        reconciler: Arc<InstanceReconciler>,
        store: Arc<dyn ResourceStore>,
        config: ControllerConfig,
    ) -> Self {
        Self {
            reconciler,
            store,
            queue: Arc::new(WorkQueue::new()),
            retries: Mutex::new(RetryTracker::new(
                config.backoff.clone(),
                config.max_retries,
                config.retry_window,
            )),
            config,
        }
    }

    pub fn queue(&self) -> &Arc<WorkQueue> {
        &self.queue
    }

    /// Run until shutdown is signaled. Workers finish their current key.
    #[instrument(skip(self, shutdown), fields(workers = self.config.workers))]
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!(
            resync_secs = self.config.resync_interval.as_secs(),
            "Starting instance controller"
        );

        // Subscribe before the first resync so no change falls in between.
        let events = self.store.watch();

        let mut tasks = JoinSet::new();
        tasks.spawn(Arc::clone(&self).forward(events, shutdown.clone()));
        tasks.spawn(Arc::clone(&self).resync_loop(shutdown.clone()));
        for worker in 0..self.config.workers.max(1) {
            tasks.spawn(Arc::clone(&self).work(worker));
        }

        loop {
            if *shutdown.borrow() {
                break;
            }
            if shutdown.changed().await.is_err() {
                break;
            }
        }

        info!("Instance controller shutting down");
        self.queue.shutdown().await;
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "Controller task panicked");
            }
        }
        info!("Instance controller stopped");
    }

    async fn forward(
        self: Arc<Self>,
        mut events: broadcast::Receiver<WatchEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                received = events.recv() => match received {
                    Ok(event) => {
                        if let Some(key) = event.instance_key() {
                            self.queue.add(key.clone()).await;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Watch lagged; resyncing");
                        self.resync().await;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        warn!("Watch closed");
                        break;
                    }
                },
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }

    async fn resync_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        // The first tick fires immediately and doubles as the initial list.
        let mut interval = tokio::time::interval(self.config.resync_interval);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.resync().await;
                    self.retries.lock().await.prune();
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }

    async fn resync(&self) {
        match self.store.list_instances().await {
            Ok(instances) => {
                debug!(count = instances.len(), "Resyncing instances");
                for instance in instances {
                    self.queue.add(instance.key()).await;
                }
            }
            Err(e) => error!(error = %e, "Failed to list instances for resync"),
        }
    }

    async fn work(self: Arc<Self>, worker: usize) {
        debug!(worker, "Worker started");
        while let Some(key) = self.queue.get().await {
            let retry_key = key.to_string();
            match self.reconciler.reconcile(&key).await {
                Ok(outcome) => {
                    self.retries.lock().await.on_success(&retry_key);
                    debug!(worker, key = %key, outcome = ?outcome, "Reconciled");
                }
                Err(e) => {
                    let retry = self.retries.lock().await.on_failure(&retry_key);
                    if retry.exhausted {
                        error!(
                            key = %key,
                            attempts = retry.attempt,
                            error = %e,
                            "Reconcile keeps failing; retrying at maximum backoff"
                        );
                    }

                    warn!(
                        key = %key,
                        attempts = retry.attempt,
                        transient = e.is_transient(),
                        retry_in_ms = retry.delay.as_millis() as u64,
                        error = %e,
                        "Reconcile failed"
                    );
                    self.queue.add_after(key.clone(), retry.delay);
                }
            }
            self.queue.done(&key).await;
        }
        debug!(worker, "Worker stopped");
    }
}
