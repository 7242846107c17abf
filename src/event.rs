use serde::{Serialize, Serializer};
use serde_json::Value;

/// Reserved data payload marking the end of a stream
pub const DONE_SENTINEL: &str = "[DONE]";

/// Event name used for the sentinel, regardless of any `event:` field
pub const DONE_EVENT: &str = "done";

/// Event name used when a message carries no `event:` field
pub const DEFAULT_EVENT: &str = "message";

/// Payload carried by a decoded event
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Data decoded as a JSON value
    Json(Value),
    /// Data that failed to decode, passed through verbatim
    Raw(String),
    /// The `[DONE]` termination sentinel
    Done,
}

impl Payload {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_raw(&self) -> Option<&str> {
        match self {
            Payload::Raw(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Payload::Done)
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Payload::Json(value) => value.serialize(serializer),
            Payload::Raw(text) => serializer.serialize_str(text),
            Payload::Done => serializer.serialize_str(DONE_SENTINEL),
        }
    }
}

/// One fully decoded SSE message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    #[serde(rename = "event")]
    pub name: String,
    #[serde(rename = "data")]
    pub payload: Payload,
}

impl Event {
    pub fn new(name: impl Into<String>, payload: Payload) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }

    /// The sentinel event emitted for a `[DONE]` payload
    pub fn done() -> Self {
        Self::new(DONE_EVENT, Payload::Done)
    }

    pub fn is_done(&self) -> bool {
        self.payload.is_done()
    }

    /// Whether the payload failed to decode and was forwarded as raw text
    pub fn is_degraded(&self) -> bool {
        matches!(self.payload, Payload::Raw(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_serializes_as_event_and_data() {
        let payload = Payload::Json(json!({"delta": "Hel"}));
        let event = Event::new("response.output_text.delta", payload);
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({"event": "response.output_text.delta", "data": {"delta": "Hel"}})
        );
    }

    #[test]
    fn test_done_serializes_as_sentinel() {
        let value = serde_json::to_value(Event::done()).unwrap();
        assert_eq!(value, json!({"event": "done", "data": "[DONE]"}));
    }

    #[test]
    fn test_raw_payload_accessors() {
        let event = Event::new("response.error", Payload::Raw("{not json}".to_string()));
        assert!(event.is_degraded());
        assert!(!event.is_done());
        assert_eq!(event.payload.as_raw(), Some("{not json}"));
        assert!(event.payload.as_json().is_none());
    }
}
