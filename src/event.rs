//! Event model.
//!
//! An [`Event`] is the immutable unit of data that flows through a pipeline.
//! Operators never mutate an event in place: a transforming operator takes the
//! event by value and returns a new one, typically built with [`Event::derive`].

use crate::error::{PipelineError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Opaque event identifier, unique within one pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for EventId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Keyed collection of typed payload fields
pub type Payload = Map<String, Value>;

/// Auxiliary string metadata attached to an event
pub type Metadata = BTreeMap<String, String>;

/// Immutable unit of data traversing the pipeline.
///
/// Deserialization goes through [`Event::new`], so records with an empty id
/// or type are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEvent")]
pub struct Event {
    id: EventId,
    timestamp: DateTime<Utc>,
    event_type: String,
    payload: Payload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    partition_key: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    metadata: Metadata,
}

/// Wire form of an [`Event`] before validation
#[derive(Deserialize)]
struct RawEvent {
    id: EventId,
    timestamp: DateTime<Utc>,
    event_type: String,
    payload: Payload,
    #[serde(default)]
    partition_key: Option<String>,
    #[serde(default)]
    metadata: Metadata,
}

impl TryFrom<RawEvent> for Event {
    type Error = PipelineError;

    fn try_from(raw: RawEvent) -> Result<Self> {
        let mut event = Event::new(raw.id, raw.timestamp, raw.event_type, raw.payload)?;
        event.partition_key = raw.partition_key;
        event.metadata = raw.metadata;
        Ok(event)
    }
}

impl Event {
    /// Create a new event.
    ///
    /// The id and type must be non-empty; the payload is not inspected.
    pub fn new(
        id: impl Into<EventId>,
        timestamp: DateTime<Utc>,
        event_type: impl Into<String>,
        payload: Payload,
    ) -> Result<Self> {
        let id = id.into();
        let event_type = event_type.into();

        if id.as_str().is_empty() {
            return Err(PipelineError::InvalidEvent("event id must not be empty".into()));
        }
        if event_type.is_empty() {
            return Err(PipelineError::InvalidEvent(format!(
                "event {} has an empty type",
                id
            )));
        }

        Ok(Self {
            id,
            timestamp,
            event_type,
            payload,
            partition_key: None,
            metadata: Metadata::new(),
        })
    }

    /// Create a new event stamped with the current wall-clock time
    pub fn now(
        id: impl Into<EventId>,
        event_type: impl Into<String>,
        payload: Payload,
    ) -> Result<Self> {
        Self::new(id, Utc::now(), event_type, payload)
    }

    /// Attach an advisory partition key
    pub fn with_partition_key(mut self, key: impl Into<String>) -> Self {
        self.partition_key = Some(key.into());
        self
    }

    /// Attach auxiliary metadata, replacing any existing map
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Add a single metadata entry
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Add or replace a payload field
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// Build a derived event carrying this event's identity, timestamp,
    /// partition key and metadata, with a new type and payload.
    pub fn derive(&self, event_type: impl Into<String>, payload: Payload) -> Result<Self> {
        let mut child = Self::new(self.id.clone(), self.timestamp, event_type, payload)?;
        child.partition_key = self.partition_key.clone();
        child.metadata = self.metadata.clone();
        Ok(child)
    }

    pub fn id(&self) -> &EventId {
        &self.id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Look up a single payload field
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    pub fn partition_key(&self) -> Option<&str> {
        self.partition_key.as_deref()
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Consume the event and return its payload
    pub fn into_payload(self) -> Payload {
        self.payload
    }
}
