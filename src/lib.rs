//! Promise-style request/response over a fire-and-forget message bus
//!
//! A bus that can only `publish(channel, args)` and `subscribe(channel)`
//! gives no way to get an answer back. This crate layers a small
//! correlation protocol on top of it:
//!
//! - a [`Caller`] publishes `[replyChannel, ...args]` on a route, where
//!   `replyChannel` is `"<route>#<token>"` and unique per call, and waits for
//!   the single reply on that channel, or for its timeout
//! - a [`Responder`] runs the route's handler and publishes
//!   `["success", value]` or `["failure", snapshot]` on the reply channel
//!
//! Each call settles exactly once. Failures are serialized structurally
//! (see [`Thrown`]) because nothing live can cross the bus, and are rebuilt
//! on the caller side as [`RpcError::Remote`] or [`RpcError::Rejected`].
//!
//! [`PromiseIpc`] bundles both roles over one transport.
//!

// Import all sub modules once...
mod caller;
mod domain;
mod protocol;
mod responder;
mod transport;

mod builder;
mod config;
mod ipc;

mod correlation;
mod error;
mod macros;

pub(crate) use macros::{log_debug, log_error, log_info, log_warn};

use std::sync::{Mutex, MutexGuard};

/// Acquire mutex guard, ignoring poisoning
pub(crate) fn lock_ignore_poison<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

// Re-export main types
pub use builder::PromiseIpcBuilder;
pub use caller::Caller;
pub use ipc::PromiseIpc;
pub use responder::{Args, HandlerResult, Responder, RouteToken};

pub use config::IpcConfig;

pub use correlation::{CorrelationId, TokenSource, TokenSourcePtr, UuidTokens};
pub use error::{RemoteError, Result, RpcError};

pub use protocol::{
    //
    reply_channel,
    ObjectRef,
    ReplyMessage,
    RequestMessage,
    Status,
    Thrown,
    WeakObjectRef,
    CIRCULAR_SENTINEL,
    DEPTH_SENTINEL,
    FUNCTION_SENTINEL,
    MAX_DEPTH,
    REPLY_CHANNEL_SEPARATOR,
};

pub use transport::{
    //
    create_memory_transport,
    create_memory_transport_with_hub,
    MemoryHub,
};

// --- public re-exports
pub use domain::{
    //
    Channel,
    Envelope,
    SubscriptionHandle,
    Transport,
    TransportBase,
    TransportPtr,
};
