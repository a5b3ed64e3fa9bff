// src/domain/transport.rs

//! Transport domain abstractions.
//!
//! This module defines the bus contract the caller and responder roles are
//! built on: fire-and-forget `publish` to a named channel, and `subscribe`
//! to receive whatever is published on a channel from then on. It
//! intentionally avoids any reference to concrete buses or client
//! libraries.
//!
//! The transport is responsible only for delivering opaque envelopes.
//! Correlation, settlement and timeouts are handled by the protocol roles.
//!
//! Concrete implementations of this interface live under `src/transport/`.
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;

/// Shared base state for all transport implementations.
///
/// Each concrete transport embeds this as a field named `base` and returns
/// it from [`Transport::base`], which gives it the default accessors.
pub struct TransportBase {
    /// Identifier for this transport instance, used in log lines.
    pub transport_id: String,
}

impl TransportBase {
    /// Create a new TransportBase.
    pub fn new(transport_id: impl Into<String>) -> Self {
        Self {
            transport_id: transport_id.into(),
        }
    }
}

/// A named bus channel.
///
/// Routes and reply channels are both plain channels; the protocol gives
/// reply channels the shape `"<route>#<token>"`. Channels are immutable and
/// cheap to clone.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Channel(pub Arc<str>);

impl Channel {
    /// Borrow the channel name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<T> From<T> for Channel
where
    T: Into<Arc<str>>,
{
    fn from(value: T) -> Self {
        // ---
        Channel(value.into())
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The unit of transport: a channel plus an encoded argument list.
///
/// The payload is always the JSON encoding of a positional array, which is
/// what makes the bus unable to carry live references: everything that
/// crosses it has been through serialization.
///
/// # Example
///
/// ```
/// # use promise_ipc::Envelope;
/// # use serde_json::json;
/// let env = Envelope::from_args("route", &[json!("route#abc"), json!(1)]).unwrap();
/// assert_eq!(env.args().unwrap(), vec![json!("route#abc"), json!(1)]);
/// ```
#[derive(Clone, Debug)]
pub struct Envelope {
    // ---
    /// Channel the envelope is published on.
    pub channel: Channel,

    /// JSON-encoded positional argument array.
    pub payload: Bytes,
}

impl Envelope {
    // ---
    /// Encode `args` as the payload of an envelope bound for `channel`.
    pub fn from_args(channel: impl Into<Channel>, args: &[Value]) -> Result<Self> {
        // ---
        let bytes = serde_json::to_vec(args)?;
        Ok(Self {
            channel: channel.into(),
            payload: Bytes::from(bytes),
        })
    }

    /// Decode the positional argument array.
    pub fn args(&self) -> Result<Vec<Value>> {
        Ok(serde_json::from_slice(&self.payload)?)
    }
}

/// Handle returned from a successful subscription.
///
/// The subscription remains active until either:
/// - The handle is dropped (receiver channel closes)
/// - The transport is closed
///
/// Dropping the handle unsubscribes, which is how one-shot reply
/// subscriptions are released.
pub struct SubscriptionHandle {
    // ---
    /// Receiver channel for envelopes published on the subscribed channel.
    pub inbox: mpsc::Receiver<Envelope>,
}

/// Transport abstraction.
///
/// A `Transport` provides best-effort delivery of envelopes between
/// publishers and subscribers in the same bus.
///
/// Implementations must ensure that:
/// - Once `subscribe()` returns successfully, envelopes published *after*
///   that point on the same channel are delivered to the handle.
/// - Publishing to a channel nobody subscribes to succeeds and drops the
///   envelope.
/// - No ordering is promised across channels.
///
/// The in-memory transport serves as the reference implementation of these
/// semantics.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    // ---
    /// Returns a reference to the shared base state.
    fn base(&self) -> &TransportBase;

    /// Returns the transport_id of the transport.
    ///
    /// Default implementation delegates to `base()`.
    fn transport_id(&self) -> &str {
        &self.base().transport_id
    }

    /// Publish an envelope on its channel.
    async fn publish(&self, env: Envelope) -> Result<()>;

    /// Register a subscription and return a handle for receiving envelopes.
    async fn subscribe(&self, channel: Channel) -> Result<SubscriptionHandle>;

    /// Close the transport, ending every subscription it created.
    async fn close(&self) -> Result<()>;
}

/// Shared transport pointer.
///
/// Cloning is cheap and every clone talks to the same underlying bus.
pub type TransportPtr = Arc<dyn Transport>;
