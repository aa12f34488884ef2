//! # Wire Messages
//!
//! The decoded shape of everything that travels over the bus.
//!
//! A [`Message`] is deliberately loose: every field is optional and untyped, and any
//! field the bus does not know about is kept in `extra` so that forwarding never loses
//! data.
//! The reserved `type` values below turn a message into a control command
//! (see [`Command`](crate::command::Command)).

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

pub const REGISTER_ACTOR: &str = "REGISTER_ACTOR";
pub const UPDATE_ACTOR_ADDRESS: &str = "UPDATE_ACTOR_ADDRESS";
pub const DEREGISTER_ACTOR: &str = "DEREGISTER_ACTOR";
pub const TEST_CACHE_GET: &str = "TEST_CACHE_GET";

/// Sentinel type produced when inbound bytes cannot be decoded.
pub const MESSAGE_DECODE_ERROR: &str = "MESSAGE_DECODE_ERROR";
/// Sentinel type produced when an outbound value cannot be encoded.
pub const MESSAGE_ENCODE_ERROR: &str = "MESSAGE_ENCODE_ERROR";

/// A message as seen by the bus after decoding.
///
/// Fields are kept as raw JSON values so that any well-formed object decodes. Strings are
/// only required where the bus acts on a field, see the accessors below.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<Value>,

    /// The body forwarded to `receiver_id` for passthrough messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_id: Option<Value>,

    /// Control data for register/deregister commands and codec sentinels
    /// (`actor_id`, `actor_address`, `message`, `original_error`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Message {
    /// Builds a `REGISTER_ACTOR` command.
    pub fn register(actor_id: impl Into<String>, address: impl Into<String>) -> Self {
        Self::control(REGISTER_ACTOR, actor_id, Some(address.into()))
    }

    /// Builds an `UPDATE_ACTOR_ADDRESS` command.
    pub fn update_address(actor_id: impl Into<String>, address: impl Into<String>) -> Self {
        Self::control(UPDATE_ACTOR_ADDRESS, actor_id, Some(address.into()))
    }

    /// Builds a `DEREGISTER_ACTOR` command.
    pub fn deregister(actor_id: impl Into<String>) -> Self {
        Self::control(DEREGISTER_ACTOR, actor_id, None)
    }

    /// Builds a `TEST_CACHE_GET` command.
    pub fn test_cache_get(actor_id: impl Into<String>) -> Self {
        Self::control(TEST_CACHE_GET, actor_id, None)
    }

    /// Builds an untyped message that the bus forwards `action` to `receiver_id`.
    pub fn passthrough(action: Value, receiver_id: impl Into<String>) -> Self {
        Self {
            action: Some(action),
            receiver_id: Some(Value::String(receiver_id.into())),
            ..Self::default()
        }
    }

    /// The sentinel yielded by a codec that failed to decode its input.
    pub fn decode_error(original_error: impl ToString) -> Self {
        Self::sentinel(
            MESSAGE_DECODE_ERROR,
            "There was an error decoding the message",
            original_error,
        )
    }

    /// The sentinel yielded by a codec that failed to encode its input.
    pub fn encode_error(original_error: impl ToString) -> Self {
        Self::sentinel(
            MESSAGE_ENCODE_ERROR,
            "There was an error encoding the message",
            original_error,
        )
    }

    /// The `type`, if it is a string. Any other `type` names no control command.
    pub fn kind(&self) -> Option<&str> {
        self.kind.as_ref()?.as_str()
    }

    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind() == Some(kind)
    }

    /// The `receiver_id`, if it is a string.
    pub fn receiver_id(&self) -> Option<&str> {
        self.receiver_id.as_ref()?.as_str()
    }

    /// A field of the payload object, whatever its JSON type.
    pub fn payload_field(&self, key: &str) -> Option<&Value> {
        self.payload.as_ref()?.get(key)
    }

    /// The error text carried by a codec sentinel.
    pub fn original_error(&self) -> Option<String> {
        match self.payload_field("original_error")? {
            Value::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        }
    }

    fn control(kind: &str, actor_id: impl Into<String>, address: Option<String>) -> Self {
        let mut payload = Map::new();
        payload.insert("actor_id".into(), Value::String(actor_id.into()));
        if let Some(address) = address {
            payload.insert("actor_address".into(), Value::String(address));
        }
        Self {
            kind: Some(Value::from(kind)),
            payload: Some(Value::Object(payload)),
            ..Self::default()
        }
    }

    fn sentinel(kind: &str, text: &str, original_error: impl ToString) -> Self {
        Self {
            kind: Some(Value::from(kind)),
            payload: Some(json!({
                "message": text,
                "original_error": original_error.to_string(),
            })),
            ..Self::default()
        }
    }
}
