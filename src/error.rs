//! Error types for promise-ipc calls.
//!
//! Every failure is local to one call: a handler failure, a protocol
//! violation or a timeout rejects that call's future and nothing else.

use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Errors that can occur while issuing or serving calls.
#[derive(Error, Debug)]
pub enum RpcError {
    /// The remote handler failed with an error-like value.
    ///
    /// Displays as the transmitted message.
    #[error("{0}")]
    Remote(RemoteError),

    /// The remote handler failed with a bare value (string, number, ...).
    ///
    /// The value is carried verbatim; it is never wrapped into an error object.
    #[error("{}", rejected_display(.0))]
    Rejected(Value),

    /// A reply carried a status tag other than `success` or `failure`.
    #[error("Unexpected IPC call status \"{status}\" in {route}")]
    UnexpectedStatus { status: String, route: String },

    /// No reply arrived within the configured timeout.
    #[error("{route} timed out.")]
    Timeout { route: String },

    /// An envelope did not have the positional shape the protocol requires.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The transport refused an operation or closed a subscription early.
    #[error("transport error: {0}")]
    Transport(String),

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A call on the same reply channel is still in flight.
    #[error("reply channel already in flight: {0}")]
    CorrelationInUse(String),
}

/// Result type alias for promise-ipc operations.
pub type Result<T> = std::result::Result<T, RpcError>;

fn rejected_display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// An error reconstructed on the caller side from a `failure` reply.
///
/// Carries the transmitted `name` and `message` plus every other own
/// property the responder serialized. Function-valued properties never
/// arrive; circular ones arrive as the string `"[Circular]"`.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteError {
    name: String,
    message: String,
    properties: Map<String, Value>,
}

impl RemoteError {
    /// Build a remote error from a serialized error object.
    ///
    /// Missing `name` defaults to `"Error"`, missing `message` to the empty
    /// string. Non-string values for either are rendered as JSON text.
    pub fn from_map(mut map: Map<String, Value>) -> Self {
        // ---
        let name = map
            .remove("name")
            .map(text_of)
            .unwrap_or_else(|| "Error".to_string());
        let message = map.remove("message").map(text_of).unwrap_or_default();

        Self {
            name,
            message,
            properties: map,
        }
    }

    /// The error's `name` (e.g. `"Error"`, `"TypeError"`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The error's `message`.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Look up an extra property copied from the remote error.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// All extra properties (everything except `name` and `message`).
    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }

    /// Re-assemble the serialized form, `name` and `message` included.
    pub fn to_value(&self) -> Value {
        // ---
        let mut map = Map::new();
        map.insert("name".into(), Value::String(self.name.clone()));
        map.insert("message".into(), Value::String(self.message.clone()));
        for (key, value) in &self.properties {
            map.insert(key.clone(), value.clone());
        }
        Value::Object(map)
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for RemoteError {}

fn text_of(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Turn a `failure` payload into the error the caller observes.
///
/// Objects become [`RpcError::Remote`]; anything else is handed back
/// verbatim as [`RpcError::Rejected`].
pub(crate) fn from_failure_payload(payload: Value) -> RpcError {
    match payload {
        Value::Object(map) => RpcError::Remote(RemoteError::from_map(map)),
        other => RpcError::Rejected(other),
    }
}
