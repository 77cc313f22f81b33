//! Instance event emitter.
//!
//! The emitter turns an Instance lifecycle fact into a protobuf payload,
//! wraps it in an [`EventEnvelope`] and hands it to the [`MessageBus`].

use std::sync::Arc;
use std::time::Duration;

use ic_api::Instance;
use ic_id::{IdSource, MessageId};
use ic_proto::instance::v1 as proto;
use prost::Message;
use tracing::{debug, instrument, warn};

use crate::value::decode_opaque;
use crate::{
    project_instance, BusMessage, Delivery, EventEnvelope, EventError, InstanceEventKind,
    MessageBus,
};

/// How the bus partition key is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PartitionKey {
    /// The Instance ID: all events of one Instance share a partition and
    /// keep their relative order.
    #[default]
    InstanceId,

    /// The message's own ID: spreads load, gives no per-Instance ordering.
    MessageId,
}

impl std::str::FromStr for PartitionKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "instance-id" => Ok(PartitionKey::InstanceId),
            "message-id" => Ok(PartitionKey::MessageId),
            other => Err(format!(
                "unknown partition key {other:?} (expected instance-id or message-id)"
            )),
        }
    }
}

/// Emitter configuration.
#[derive(Debug, Clone)]
pub struct EmitterConfig {
    /// Envelope source, static per deployment.
    pub source: String,

    /// Bus topic.
    pub topic: String,

    pub partition_key: PartitionKey,

    /// Deadline for a single send.
    pub send_timeout: Duration,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            source: "instance-controller".to_string(),
            topic: "instance-events".to_string(),
            partition_key: PartitionKey::default(),
            send_timeout: Duration::from_secs(5),
        }
    }
}

/// Publishes Instance lifecycle events.
pub struct Emitter {
    bus: Arc<dyn MessageBus>,
    ids: Arc<dyn IdSource>,
    config: EmitterConfig,
}

impl Emitter {
    pub fn new(bus: Arc<dyn MessageBus>, ids: Arc<dyn IdSource>, config: EmitterConfig) -> Self {
        Self { bus, ids, config }
    }

    /// Emit `network.cow.instance.started.v1`.
    #[instrument(skip_all, fields(instance_name = %instance.name()))]
    pub async fn instance_created(&self, instance: &Instance) -> Result<MessageId, EventError> {
        let event = proto::InstanceStartedEvent {
            instance: Some(project_instance(instance)?),
        };
        self.publish(InstanceEventKind::Started, instance, event.encode_to_vec())
            .await
    }

    /// Emit `network.cow.instance.ended.v1`.
    #[instrument(skip_all, fields(instance_name = %instance.name()))]
    pub async fn instance_ended(&self, instance: &Instance) -> Result<MessageId, EventError> {
        let event = proto::InstanceEndedEvent {
            instance: Some(project_instance(instance)?),
        };
        self.publish(InstanceEventKind::Ended, instance, event.encode_to_vec())
            .await
    }

    /// Emit `network.cow.instance.state-changed.v1`.
    ///
    /// `old_state` and `new_state` are raw opaque application state. Both are
    /// validated before anything is sent.
    #[instrument(skip_all, fields(instance_name = %instance.name()))]
    pub async fn instance_state_changed(
        &self,
        instance: &Instance,
        old_state: &[u8],
        new_state: &[u8],
    ) -> Result<MessageId, EventError> {
        let event = proto::InstanceStateChangedEvent {
            instance: Some(project_instance(instance)?),
            old_state: decode_opaque(old_state)?,
            new_state: decode_opaque(new_state)?,
        };
        self.publish(InstanceEventKind::StateChanged, instance, event.encode_to_vec())
            .await
    }

    async fn publish(
        &self,
        kind: InstanceEventKind,
        instance: &Instance,
        data: Vec<u8>,
    ) -> Result<MessageId, EventError> {
        let mut builder = EventEnvelope::builder()
            .id(MessageId::generate(self.ids.as_ref())?)
            .source(&self.config.source)
            .event_type(kind.event_type())
            .data(data);
        if let Some(uid) = instance.uid() {
            builder = builder.subject(uid);
        }
        let envelope = builder.build()?;

        let message = BusMessage {
            topic: self.config.topic.clone(),
            key: self.partition_key(&envelope, instance),
            headers: envelope.headers(),
            payload: envelope.data.clone(),
        };

        let sent = tokio::time::timeout(self.config.send_timeout, self.bus.send(message));
        let delivery = match sent.await {
            Ok(delivery) => delivery,
            Err(_) => Delivery::Undelivered(format!(
                "timed out after {:?}",
                self.config.send_timeout
            )),
        };

        match delivery {
            Delivery::Delivered => {
                debug!(
                    message_id = %envelope.id,
                    event_type = %envelope.event_type,
                    "Event delivered"
                );
                Ok(envelope.id)
            }
            Delivery::Undelivered(reason) => {
                warn!(
                    message_id = %envelope.id,
                    event_type = %envelope.event_type,
                    reason = %reason,
                    "Event undelivered"
                );
                Err(EventError::Undelivered {
                    event_type: envelope.event_type,
                    reason,
                })
            }
        }
    }

    fn partition_key(&self, envelope: &EventEnvelope, instance: &Instance) -> String {
        match self.config.partition_key {
            PartitionKey::InstanceId => instance
                .uid()
                .unwrap_or_else(|| instance.name())
                .to_string(),
            PartitionKey::MessageId => envelope.id.to_string(),
        }
    }
}
