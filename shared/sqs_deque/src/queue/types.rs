use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::Display;

/// Maximum number of entries SQS accepts in one `SendMessageBatch` call
pub const MAX_BATCH_SIZE: usize = 10;

/// Suffix SQS requires on the names of FIFO queues
pub const FIFO_SUFFIX: &str = ".fifo";

/// JSON shape of a payload, carried as the envelope `type` tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum PayloadKind {
    /// JSON `null`
    Null,
    /// JSON boolean
    Bool,
    /// JSON number
    Number,
    /// JSON string
    String,
    /// JSON array
    Array,
    /// JSON object
    Object,
}

impl PayloadKind {
    /// Returns the kind of a JSON value
    #[must_use]
    pub const fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Bool,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
        }
    }
}

/// Message body sent through the queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Shape of the original value, informational only
    #[serde(rename = "type")]
    pub kind: String,
    /// The value itself
    pub data: Value,
}

/// Body as read back from the queue; only `data` is looked at
#[derive(Deserialize)]
struct IncomingEnvelope {
    data: Value,
}

impl Envelope {
    /// Wraps a value for transit
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if the value cannot be represented as JSON
    pub fn wrap<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        let data = serde_json::to_value(value)?;
        Ok(Self {
            kind: PayloadKind::of(&data).to_string(),
            data,
        })
    }

    /// Serializes the envelope into a message body
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if serialization fails
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Reads the `data` field of a message body without validating `type`
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if the body is not JSON or has no `data` field
    pub fn decode_data(body: &str) -> Result<Value, serde_json::Error> {
        serde_json::from_str::<IncomingEnvelope>(body).map(|envelope| envelope.data)
    }
}

/// A message about to be sent, single or as a batch entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    /// Entry id, unique within a batch
    pub id: String,
    /// Serialized envelope
    pub body: String,
    /// Message group ID, FIFO queues only
    pub message_group_id: Option<String>,
    /// Message deduplication ID, FIFO queues only
    pub deduplication_id: Option<String>,
}

/// A message received from the queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    /// Message body, if SQS returned one
    pub body: Option<String>,
    /// Receipt handle for acknowledging the message
    pub receipt_handle: String,
    /// Message ID
    pub message_id: Option<String>,
}

/// Collection operations that have no mapping onto a remote queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Operation {
    /// Push onto the front
    AppendLeft,
    /// Push several values onto the front
    ExtendLeft,
    /// Positional insert
    Insert,
    /// Removal of an arbitrary value
    Remove,
    /// Positional read
    Get,
    /// Position lookup
    Index,
    /// Occurrence count
    Count,
    /// Containment check
    Contains,
    /// Rotation
    Rotate,
    /// Reversal
    Reverse,
    /// Copy of the whole collection
    Copy,
    /// Equality comparison
    Equals,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_wire_format() {
        let envelope = Envelope::wrap(&vec![1, 2, 3]).unwrap();
        let body = envelope.encode().unwrap();
        let raw: Value = serde_json::from_str(&body).unwrap();

        assert_eq!(raw, json!({"type": "array", "data": [1, 2, 3]}));
    }

    #[test]
    fn test_payload_kinds() {
        assert_eq!(Envelope::wrap(&()).unwrap().kind, "null");
        assert_eq!(Envelope::wrap(&true).unwrap().kind, "bool");
        assert_eq!(Envelope::wrap(&42).unwrap().kind, "number");
        assert_eq!(Envelope::wrap("hi").unwrap().kind, "string");
        assert_eq!(Envelope::wrap(&json!({"a": 1})).unwrap().kind, "object");
    }

    #[test]
    fn test_decode_ignores_type_tag() {
        let data = Envelope::decode_data(r#"{"type": "whatever", "data": {"k": "v"}}"#).unwrap();
        assert_eq!(data, json!({"k": "v"}));

        let untagged = Envelope::decode_data(r#"{"data": 7}"#).unwrap();
        assert_eq!(untagged, json!(7));
    }

    #[test]
    fn test_decode_rejects_bodies_without_data() {
        assert!(Envelope::decode_data("{}").is_err());
        assert!(Envelope::decode_data("not json").is_err());
    }

    #[test]
    fn test_operation_display() {
        assert_eq!(Operation::AppendLeft.to_string(), "append_left");
        assert_eq!(Operation::Insert.to_string(), "insert");
    }
}
