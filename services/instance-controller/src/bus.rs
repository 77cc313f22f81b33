//! Message bus transports.
//!
//! - [`HttpBus`] posts each message to an HTTP ingest endpoint
//! - [`LogBus`] only logs, for local development without a broker

use std::time::Duration;

use async_trait::async_trait;
use ic_events::{BusMessage, Delivery, MessageBus};
use tracing::{debug, error, info};

/// Header carrying the partition key on HTTP deliveries.
pub const PARTITION_KEY_HEADER: &str = "x-partition-key";

/// Delivers messages as `POST {base_url}/topics/{topic}`.
///
/// The payload is the request body. Envelope attributes travel as
/// CloudEvents HTTP headers (`ce-id`, `ce-type`, ...).
pub struct HttpBus {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBus {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

/// Binary-mode header names differ per transport: `ce_id` on the bus,
/// `ce-id` over HTTP.
fn http_header_name(name: &str) -> String {
    match name.strip_prefix("ce_") {
        Some(attribute) => format!("ce-{attribute}"),
        None => name.to_string(),
    }
}

#[async_trait]
impl MessageBus for HttpBus {
    async fn send(&self, message: BusMessage) -> Delivery {
        let url = format!("{}/topics/{}", self.base_url, message.topic);
        debug!(url = %url, key = %message.key, "Posting event");

        let mut request = self
            .client
            .post(&url)
            .header(PARTITION_KEY_HEADER, &message.key);
        for (name, value) in &message.headers {
            request = request.header(http_header_name(name), value);
        }

        match request.body(message.payload).send().await {
            Ok(response) if response.status().is_success() => Delivery::Delivered,
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                error!(status = %status, body = %body, "Event ingest rejected message");
                Delivery::Undelivered(format!("{status}: {body}"))
            }
            Err(e) => {
                error!(error = %e, "Event ingest unreachable");
                Delivery::Undelivered(e.to_string())
            }
        }
    }
}

/// Logs each message and reports it delivered.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogBus;

#[async_trait]
impl MessageBus for LogBus {
    async fn send(&self, message: BusMessage) -> Delivery {
        info!(
            topic = %message.topic,
            key = %message.key,
            event_type = message.header(ic_events::headers::TYPE).unwrap_or_default(),
            message_id = message.header(ic_events::headers::ID).unwrap_or_default(),
            bytes = message.payload.len(),
            "[LOG] Event published"
        );
        Delivery::Delivered
    }
}
