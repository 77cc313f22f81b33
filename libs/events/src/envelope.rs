//! Event envelope - the transport wrapper around every serialized event.

use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use ic_id::MessageId;

use crate::EventError;

/// Envelope spec version.
pub const SPEC_VERSION: &str = "1.0";

/// Content type of every payload.
pub const CONTENT_TYPE_PROTOBUF: &str = "application/protobuf";

/// Header names used when the envelope travels in binary mode.
pub mod headers {
    pub const ID: &str = "ce_id";
    pub const SOURCE: &str = "ce_source";
    pub const TYPE: &str = "ce_type";
    pub const SPEC_VERSION: &str = "ce_specversion";
    pub const TIME: &str = "ce_time";
    pub const SUBJECT: &str = "ce_subject";
    pub const CONTENT_TYPE: &str = "content-type";
}

/// The event envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct EventEnvelope {
    /// Unique per send.
    pub id: MessageId,

    /// Static per deployment.
    pub source: String,

    /// Versioned event type (e.g. "network.cow.instance.started.v1").
    pub event_type: String,

    pub spec_version: String,

    pub data_content_type: String,

    /// When the event was built.
    pub time: DateTime<Utc>,

    /// Instance ID the event is about, if it has one.
    pub subject: Option<String>,

    /// Serialized domain event.
    pub data: Bytes,
}

impl EventEnvelope {
    /// Creates a new event envelope builder.
    pub fn builder() -> EventEnvelopeBuilder {
        EventEnvelopeBuilder::new()
    }

    /// Envelope attributes as bus headers.
    pub fn headers(&self) -> Vec<(String, String)> {
        let mut out = vec![
            (headers::ID.to_string(), self.id.to_string()),
            (headers::SOURCE.to_string(), self.source.clone()),
            (headers::TYPE.to_string(), self.event_type.clone()),
            (headers::SPEC_VERSION.to_string(), self.spec_version.clone()),
            (
                headers::TIME.to_string(),
                self.time.to_rfc3339_opts(SecondsFormat::Millis, true),
            ),
            (headers::CONTENT_TYPE.to_string(), self.data_content_type.clone()),
        ];
        if let Some(subject) = &self.subject {
            out.push((headers::SUBJECT.to_string(), subject.clone()));
        }
        out
    }
}

/// Builder for constructing event envelopes.
#[derive(Debug, Default)]
pub struct EventEnvelopeBuilder {
    id: Option<MessageId>,
    source: Option<String>,
    event_type: Option<String>,
    spec_version: Option<String>,
    data_content_type: Option<String>,
    time: Option<DateTime<Utc>>,
    subject: Option<String>,
    data: Option<Bytes>,
}

impl EventEnvelopeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: MessageId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    pub fn spec_version(mut self, version: impl Into<String>) -> Self {
        self.spec_version = Some(version.into());
        self
    }

    pub fn data_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.data_content_type = Some(content_type.into());
        self
    }

    pub fn time(mut self, ts: DateTime<Utc>) -> Self {
        self.time = Some(ts);
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Builds the event envelope.
    ///
    /// `id`, `source`, `event_type` and `data` are required. Spec version,
    /// content type and time default to `1.0`, protobuf and now.
    pub fn build(self) -> Result<EventEnvelope, EventError> {
        let missing = |field: &str| EventError::InvalidEnvelope(format!("{field} is required"));

        let source = self.source.ok_or_else(|| missing("source"))?;
        if source.is_empty() {
            return Err(EventError::InvalidEnvelope("source is empty".to_string()));
        }

        Ok(EventEnvelope {
            id: self.id.ok_or_else(|| missing("id"))?,
            source,
            event_type: self.event_type.ok_or_else(|| missing("event_type"))?,
            spec_version: self.spec_version.unwrap_or_else(|| SPEC_VERSION.to_string()),
            data_content_type: self
                .data_content_type
                .unwrap_or_else(|| CONTENT_TYPE_PROTOBUF.to_string()),
            time: self.time.unwrap_or_else(Utc::now),
            subject: self.subject,
            data: self.data.ok_or_else(|| missing("data"))?,
        })
    }
}
