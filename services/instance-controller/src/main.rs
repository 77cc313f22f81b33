//! Instance controller
//!
//! Watches Instance resources, drives each one through its lifecycle and
//! publishes lifecycle events. Ships with an in-memory store and a small
//! HTTP surface for local development.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use ic_events::{Emitter, EmitterConfig, MessageBus};
use ic_id::{IdSource, OsRandomSource};
use ic_instance_controller::{
    api,
    bus::{HttpBus, LogBus},
    config,
    controller::{Controller, ControllerConfig},
    reconciler::{EventFailurePolicy, InstanceReconciler, ReconcilerConfig},
    state::AppState,
    store::{MemoryStore, ResourceStore},
};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::Config::from_env()?;

    // Initialize tracing (prefer RUST_LOG, fallback to IC_LOG_LEVEL)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting instance controller");
    info!(
        listen_addr = %config.listen_addr,
        workers = config.workers,
        partition_key = ?config.partition_key,
        "Configuration loaded"
    );

    let store: Arc<dyn ResourceStore> = Arc::new(MemoryStore::new());
    let ids: Arc<dyn IdSource> = Arc::new(OsRandomSource);

    let bus: Arc<dyn MessageBus> = match &config.bus_url {
        Some(url) => {
            info!(url = %url, "Publishing events over HTTP");
            Arc::new(HttpBus::new(url.clone(), config.call_timeout)?)
        }
        None => {
            warn!("IC_BUS_URL not set; events are only logged");
            Arc::new(LogBus)
        }
    };

    let emitter = Arc::new(Emitter::new(
        bus,
        Arc::clone(&ids),
        EmitterConfig {
            source: config.event_source.clone(),
            topic: config.event_topic.clone(),
            partition_key: config.partition_key,
            send_timeout: config.call_timeout,
        },
    ));

    let reconciler = Arc::new(InstanceReconciler::new(
        Arc::clone(&store),
        Arc::clone(&emitter),
        ids,
        ReconcilerConfig {
            call_timeout: config.call_timeout,
            event_failure_policy: if config.fail_on_event_error {
                EventFailurePolicy::Propagate
            } else {
                EventFailurePolicy::LogAndDrop
            },
        },
    ));

    let controller = Arc::new(Controller::new(
        reconciler,
        Arc::clone(&store),
        ControllerConfig {
            workers: config.workers,
            resync_interval: config.resync_interval,
            ..Default::default()
        },
    ));

    // Create shutdown channel for graceful shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let controller_handle = tokio::spawn(controller.run(shutdown_rx.clone()));

    let app = api::create_router(AppState::new(store, emitter));
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(addr = %config.listen_addr, "Listening for connections");

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let mut shutdown_rx = shutdown_rx;
                loop {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                    if shutdown_rx.changed().await.is_err() {
                        break;
                    }
                }
                info!("HTTP server shutting down");
            })
            .await
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
        result = server_handle => {
            match result {
                Ok(Ok(())) => info!("Server exited normally"),
                Ok(Err(e)) => error!(error = %e, "Server error"),
                Err(e) => error!(error = %e, "Server task panicked"),
            }
        }
    }

    let _ = shutdown_tx.send(true);

    info!("Waiting for workers to shut down...");
    let shutdown_timeout = Duration::from_secs(10);
    if let Err(e) = tokio::time::timeout(shutdown_timeout, controller_handle).await {
        warn!(error = %e, "Controller did not shut down in time");
    }

    info!("Instance controller shutdown complete");
    Ok(())
}
