use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A fully-formed business occurrence consumed from the internal event bus.
///
/// Accepts both the enveloped form `{"type": .., "data": {..}}` and the flat
/// form where targeting fields sit next to `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawDomainEvent")]
pub struct DomainEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: Value,
}

impl DomainEvent {
    pub fn new(event_type: impl Into<String>, data: Value) -> Self {
        Self {
            event_type: event_type.into(),
            data,
        }
    }
}

#[derive(Deserialize)]
struct RawDomainEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    data: Option<Value>,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

impl From<RawDomainEvent> for DomainEvent {
    fn from(raw: RawDomainEvent) -> Self {
        let data = match raw.data {
            Some(data) => data,
            None => Value::Object(raw.rest),
        };
        Self {
            event_type: raw.event_type,
            data,
        }
    }
}

/// Frame pushed to a client: `{"event": name, "data": payload}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundEvent {
    pub event: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl OutboundEvent {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Wire form of the frame; `data` is omitted when null.
    pub fn to_frame(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
