//! Message records, inbound payloads, and call metadata.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;
use crate::ids::{ConnectionId, MessageId};

/// A stored message.
///
/// Timestamps are stamped by hooks before the record is persisted and are
/// omitted from JSON when unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Store-assigned identifier.
    pub id: MessageId,
    /// Message body supplied by the caller.
    pub text: String,
    /// When the message was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// When the message was last replaced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Payload of a `create`, `update`, or `patch` call.
///
/// Only `text` is read from the wire. The timestamp fields are filled in
/// by hooks; caller-supplied values are ignored during deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageData {
    /// Message body. Required by `create`.
    #[serde(default)]
    pub text: Option<String>,
    /// Set by the `createdAt` hook.
    #[serde(skip_deserializing)]
    pub created_at: Option<DateTime<Utc>>,
    /// Set by the `updatedAt` hook.
    #[serde(skip_deserializing)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl MessageData {
    /// Build a payload carrying only `text`.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }
}

/// Transport a call arrived through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// HTTP REST request.
    Rest,
    /// Real-time `WebSocket` call.
    Socket,
}

/// Call metadata passed alongside every service call.
///
/// The core only reads it for logging; transports fill in whatever they
/// know about the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    /// Transport the call came from. `None` for in-process calls.
    pub provider: Option<Provider>,
    /// Real-time connection that issued the call, if any.
    pub connection: Option<ConnectionId>,
    /// Raw query-string parameters.
    pub query: BTreeMap<String, String>,
}

impl Params {
    /// Metadata for a REST request.
    pub fn rest(query: BTreeMap<String, String>) -> Self {
        Self {
            provider: Some(Provider::Rest),
            connection: None,
            query,
        }
    }

    /// Metadata for a call issued over a real-time connection.
    pub const fn socket(connection: ConnectionId) -> Self {
        Self {
            provider: Some(Provider::Socket),
            connection: Some(connection),
            query: BTreeMap::new(),
        }
    }
}

/// Result of a service call: a single record or a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Outcome {
    /// A single message (`create`, `update`, `patch`).
    Record(Message),
    /// A list of messages (`find`, `remove`).
    Collection(Vec<Message>),
}

impl Outcome {
    /// Unwrap a single record, failing if a hook replaced it with a list.
    pub fn into_record(self) -> Result<Message, ServiceError> {
        match self {
            Self::Record(message) => Ok(message),
            Self::Collection(_) => Err(ServiceError::Internal(String::from(
                "expected a single message, got a collection",
            ))),
        }
    }

    /// Unwrap a collection. A single record becomes a one-element list.
    pub fn into_collection(self) -> Vec<Message> {
        match self {
            Self::Record(message) => vec![message],
            Self::Collection(messages) => messages,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn message_omits_unset_timestamps() {
        let message = Message {
            id: MessageId(0),
            text: String::from("hi"),
            created_at: None,
            updated_at: None,
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json, serde_json::json!({"id": 0, "text": "hi"}));
    }

    #[test]
    fn message_uses_camel_case_timestamps() {
        let message = Message {
            id: MessageId(3),
            text: String::from("yo"),
            created_at: Some(Utc::now()),
            updated_at: None,
        };
        let json = serde_json::to_value(&message).unwrap();
        assert!(json["createdAt"].is_string());
        assert!(json.get("updatedAt").is_none());
    }

    #[test]
    fn payload_ignores_caller_supplied_timestamps() {
        let data: MessageData = serde_json::from_str(
            r#"{"text": "hi", "createdAt": "2001-01-01T00:00:00Z", "updatedAt": "x"}"#,
        )
        .unwrap();
        assert_eq!(data.text.as_deref(), Some("hi"));
        assert!(data.created_at.is_none());
        assert!(data.updated_at.is_none());
    }

    #[test]
    fn payload_without_text_deserializes() {
        let data: MessageData = serde_json::from_str("{}").unwrap();
        assert!(data.text.is_none());
    }

    #[test]
    fn outcome_serializes_untagged() {
        let outcome = Outcome::Collection(Vec::new());
        assert_eq!(serde_json::to_string(&outcome).unwrap(), "[]");
    }

    #[test]
    fn collection_is_not_a_record() {
        assert!(Outcome::Collection(Vec::new()).into_record().is_err());
    }
}
