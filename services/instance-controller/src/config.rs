use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use ic_events::PartitionKey;

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub log_level: String,
    pub workers: usize,
    pub call_timeout: Duration,
    pub resync_interval: Duration,
    pub event_source: String,
    pub event_topic: String,
    pub partition_key: PartitionKey,
    /// Event ingest endpoint. Events are only logged when unset.
    pub bus_url: Option<String>,
    pub fail_on_event_error: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let listen_addr = var("IC_LISTEN_ADDR")
            .unwrap_or_else(|| "127.0.0.1:8080".to_string())
            .parse::<SocketAddr>()
            .context("IC_LISTEN_ADDR")?;

        let log_level = var("IC_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let workers = var("IC_WORKERS")
            .map(|v| v.parse::<usize>())
            .transpose()
            .context("IC_WORKERS")?
            .unwrap_or(4);
        if workers == 0 {
            anyhow::bail!("IC_WORKERS must be at least 1");
        }

        let call_timeout = var("IC_CALL_TIMEOUT_MS")
            .map(|v| v.parse::<u64>())
            .transpose()
            .context("IC_CALL_TIMEOUT_MS")?
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_secs(5));

        let resync_interval = var("IC_RESYNC_INTERVAL_SECS")
            .map(|v| v.parse::<u64>())
            .transpose()
            .context("IC_RESYNC_INTERVAL_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(ic_reconcile::DEFAULT_RESYNC_INTERVAL);

        let event_source =
            var("IC_EVENT_SOURCE").unwrap_or_else(|| "instance-controller".to_string());
        let event_topic = var("IC_EVENT_TOPIC").unwrap_or_else(|| "instance-events".to_string());

        let partition_key = match var("IC_PARTITION_KEY") {
            Some(v) => v.parse::<PartitionKey>().map_err(anyhow::Error::msg)?,
            None => PartitionKey::default(),
        };

        let bus_url = var("IC_BUS_URL").filter(|v| !v.is_empty());

        let fail_on_event_error = var("IC_FAIL_ON_EVENT_ERROR")
            .map(|v| v == "1" || v.to_lowercase() == "true")
            .unwrap_or(false);

        Ok(Self {
            listen_addr,
            log_level,
            workers,
            call_timeout,
            resync_interval,
            event_source,
            event_topic,
            partition_key,
            bus_url,
            fail_on_event_error,
        })
    }
}
