//! Message bus interface and in-memory implementation.
//!
//! The bus abstracts delivery of a single binary message:
//! - `topic` selects the stream
//! - `key` selects the partition (and therefore relative ordering)
//! - `headers` carry the envelope attributes
//!
//! An in-memory implementation is provided for testing and development.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Mutex;
use tracing::debug;

/// A message ready to hand to the bus.
#[derive(Debug, Clone, PartialEq)]
pub struct BusMessage {
    pub topic: String,
    pub key: String,
    pub headers: Vec<(String, String)>,
    pub payload: Bytes,
}

impl BusMessage {
    /// First header with the given name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Result of a send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    Undelivered(String),
}

impl Delivery {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Delivery::Delivered)
    }
}

/// Message bus interface.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Send one message. Transport errors are reported as `Undelivered`.
    async fn send(&self, message: BusMessage) -> Delivery;
}

/// In-memory bus that records every delivered message.
#[derive(Debug, Default)]
pub struct MemoryBus {
    sent: Mutex<Vec<BusMessage>>,
    failure: Mutex<Option<String>>,
}

impl MemoryBus {
    /// Create a new bus that delivers everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bus that reports every send as undelivered.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failure: Mutex::new(Some(reason.into())),
        }
    }

    /// Switch failure mode on (`Some(reason)`) or off.
    pub async fn set_failure(&self, reason: Option<String>) {
        *self.failure.lock().await = reason;
    }

    /// Messages delivered so far, in send order.
    pub async fn messages(&self) -> Vec<BusMessage> {
        self.sent.lock().await.clone()
    }

    pub async fn clear(&self) {
        self.sent.lock().await.clear();
    }
}

#[async_trait]
impl MessageBus for MemoryBus {
    async fn send(&self, message: BusMessage) -> Delivery {
        if let Some(reason) = self.failure.lock().await.clone() {
            return Delivery::Undelivered(reason);
        }

        debug!(
            topic = %message.topic,
            key = %message.key,
            bytes = message.payload.len(),
            "[MEMORY] Message delivered"
        );
        self.sent.lock().await.push(message);
        Delivery::Delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> BusMessage {
        BusMessage {
            topic: "instance-events".to_string(),
            key: "abc".to_string(),
            headers: vec![("Content-Type".to_string(), "application/protobuf".to_string())],
            payload: Bytes::from_static(b"\x0a\x00"),
        }
    }

    #[tokio::test]
    async fn test_memory_bus_records() {
        let bus = MemoryBus::new();
        assert!(bus.send(message()).await.is_delivered());

        let sent = bus.messages().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].header("content-type"), Some("application/protobuf"));
    }

    #[tokio::test]
    async fn test_memory_bus_failing() {
        let bus = MemoryBus::failing("broker down");
        assert_eq!(
            bus.send(message()).await,
            Delivery::Undelivered("broker down".to_string())
        );
        assert!(bus.messages().await.is_empty());

        bus.set_failure(None).await;
        assert!(bus.send(message()).await.is_delivered());
    }
}
