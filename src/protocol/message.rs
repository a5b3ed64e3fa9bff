//! Positional wire messages.
//!
//! request = `[replyChannel, arg1, arg2, ...]` published on the route
//! reply   = `[status, payload]` published on the reply channel

use crate::{Channel, CorrelationId, Envelope, Result, RpcError};
use serde_json::Value;

/// Separator between the route and the correlation token in a reply channel.
pub const REPLY_CHANNEL_SEPARATOR: char = '#';

/// Derive the reply channel for one call: `"<route>#<token>"`.
pub fn reply_channel(route: &str, token: &CorrelationId) -> Channel {
    Channel::from(format!("{route}{REPLY_CHANNEL_SEPARATOR}{token}"))
}

/// Reply status tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Failure,
}

impl Status {
    /// Wire spelling of the tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Success => "success",
            Status::Failure => "failure",
        }
    }

    /// Parse a wire tag; anything unrecognized is `None`.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "success" => Some(Status::Success),
            "failure" => Some(Status::Failure),
            _ => None,
        }
    }
}

/// A decoded request: where to reply, and the handler arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestMessage {
    pub reply_channel: Channel,
    pub args: Vec<Value>,
}

impl RequestMessage {
    /// Encode as an envelope on `route`.
    pub fn into_envelope(self, route: &str) -> Result<Envelope> {
        // ---
        let mut wire = Vec::with_capacity(self.args.len() + 1);
        wire.push(Value::String(self.reply_channel.as_str().to_string()));
        wire.extend(self.args);
        Envelope::from_args(route, &wire)
    }

    /// Decode an inbound request envelope.
    ///
    /// The first element must be a string naming the reply channel.
    pub fn decode(env: &Envelope) -> Result<Self> {
        // ---
        let mut wire = env.args()?.into_iter();
        let reply_channel = match wire.next() {
            Some(Value::String(channel)) => Channel::from(channel),
            Some(other) => {
                return Err(RpcError::Protocol(format!(
                    "request on {} has non-string reply channel {other}",
                    env.channel
                )))
            }
            None => {
                return Err(RpcError::Protocol(format!(
                    "request on {} is missing its reply channel",
                    env.channel
                )))
            }
        };

        Ok(Self {
            reply_channel,
            args: wire.collect(),
        })
    }
}

/// A reply as it came off the wire.
///
/// The status is kept raw so that a caller can report exactly what an
/// unrecognized tag said.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyMessage {
    pub status: String,
    pub payload: Value,
}

impl ReplyMessage {
    /// A `[success, value]` reply.
    pub fn success(value: Value) -> Self {
        Self {
            status: Status::Success.as_str().to_string(),
            payload: value,
        }
    }

    /// A `[failure, serialized]` reply.
    pub fn failure(serialized: Value) -> Self {
        Self {
            status: Status::Failure.as_str().to_string(),
            payload: serialized,
        }
    }

    /// The recognized status tag, if any.
    pub fn status(&self) -> Option<Status> {
        Status::parse(&self.status)
    }

    /// Encode as an envelope on `reply_channel`.
    pub fn into_envelope(self, reply_channel: Channel) -> Result<Envelope> {
        Envelope::from_args(reply_channel, &[Value::String(self.status), self.payload])
    }

    /// Decode an inbound reply envelope.
    ///
    /// A missing payload decodes as `null`. A non-string status is kept as
    /// its JSON text so it can still be reported as unexpected.
    pub fn decode(env: &Envelope) -> Result<Self> {
        // ---
        let mut wire = env.args()?.into_iter();
        let status = match wire.next() {
            Some(Value::String(tag)) => tag,
            Some(other) => other.to_string(),
            None => {
                return Err(RpcError::Protocol(format!(
                    "reply on {} is missing its status",
                    env.channel
                )))
            }
        };

        Ok(Self {
            status,
            payload: wire.next().unwrap_or(Value::Null),
        })
    }
}
