//! In-memory transport implementation.
//!
//! This module provides a pure in-process implementation of the domain-level
//! `Transport` trait. It is intended for tests, demos, and as the reference
//! for transport semantics.
//!
//! ## Reference Semantics
//!
//! - Once `subscribe()` returns successfully, envelopes published *after*
//!   that point on the same channel are deliverable.
//! - Channel matching is exact string equality; there are no wildcards.
//! - Publishing to a channel without live subscribers drops the envelope.
//! - Dropping a `SubscriptionHandle` unsubscribes. Dead senders are pruned
//!   on the next publish to their channel, and every `subscribe()` sweeps
//!   channels left without live subscribers.
//!
//! ## Non-Goals
//!
//! This transport does not emulate the failure modes, persistence, or
//! delivery guarantees of any real bus.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use tokio::sync::{mpsc, RwLock};

#[allow(unused_imports)]
use crate::{
    // ---
    log_debug,
    log_error,
    log_info,
    log_warn,
    Channel,
    Envelope,
    Result,
    SubscriptionHandle,
    Transport,
    TransportBase,
    TransportPtr,
};

/// Inbox depth per subscription.
const INBOX_CAPACITY: usize = 64;

/// One live subscription: the transport that made it and its inbox sender.
struct Subscriber {
    owner: String,
    sender: mpsc::Sender<Envelope>,
}

/// Shared message bus for the in-memory transport.
///
/// All transports created on the same hub see each other's envelopes, the
/// way two processes on either end of one IPC pipe would.
///
/// # Usage in Tests
///
/// Construct a hub per test to isolate parallel test cases:
///
/// ```
/// # use promise_ipc::{create_memory_transport_with_hub, MemoryHub};
/// # async fn example() -> promise_ipc::Result<()> {
/// let hub = MemoryHub::new();
///
/// let main_side = create_memory_transport_with_hub("main", hub.clone()).await?;
/// let renderer_side = create_memory_transport_with_hub("renderer", hub.clone()).await?;
/// # Ok(())
/// # }
/// ```
pub struct MemoryHub {
    // ---
    subscriptions: RwLock<HashMap<Channel, Vec<Subscriber>>>,
}

impl MemoryHub {
    /// Create a new, empty hub.
    pub fn new() -> Arc<Self> {
        // ---
        Arc::new(Self::default())
    }

    /// Number of live subscriptions on `channel`.
    pub async fn subscriber_count(&self, channel: &Channel) -> usize {
        // ---
        let subs = self.subscriptions.read().await;
        subs.get(channel)
            .map(|list| list.iter().filter(|s| !s.sender.is_closed()).count())
            .unwrap_or(0)
    }

    async fn publish(&self, _transport_id: &str, env: Envelope) -> Result<()> {
        // ---
        // Snapshot the senders so no lock is held while awaiting inbox space.
        let senders: Vec<mpsc::Sender<Envelope>> = {
            let subs = self.subscriptions.read().await;
            subs.get(&env.channel)
                .map(|list| list.iter().map(|s| s.sender.clone()).collect())
                .unwrap_or_default()
        };

        if senders.is_empty() {
            log_debug!("{_transport_id}: no subscribers on {}, dropping", env.channel);
            return Ok(());
        }

        log_debug!("{_transport_id}: publish to {}", env.channel);

        let mut saw_closed = false;
        for sender in senders {
            // A closed channel indicates a dropped SubscriptionHandle.
            if sender.send(env.clone()).await.is_err() {
                saw_closed = true;
            }
        }

        if saw_closed {
            self.prune(&env.channel).await;
        }

        Ok(())
    }

    async fn subscribe(&self, transport_id: &str, channel: Channel) -> Result<SubscriptionHandle> {
        // ---
        log_debug!("{transport_id}: subscribe to {channel}");

        let (tx, rx) = mpsc::channel(INBOX_CAPACITY);

        let mut subs = self.subscriptions.write().await;

        // Reply channels are never reused, so channels whose subscribers are
        // all gone are swept here rather than waiting for a publish.
        subs.retain(|_, list| {
            list.retain(|s| !s.sender.is_closed());
            !list.is_empty()
        });

        subs.entry(channel).or_default().push(Subscriber {
            owner: transport_id.to_string(),
            sender: tx,
        });

        Ok(SubscriptionHandle { inbox: rx })
    }

    async fn close(&self, transport_id: &str) -> Result<()> {
        // ---
        log_debug!("{transport_id}: closing transport...");

        let mut subs = self.subscriptions.write().await;
        for list in subs.values_mut() {
            list.retain(|s| s.owner != transport_id);
        }
        subs.retain(|_, list| !list.is_empty());
        Ok(())
    }

    async fn prune(&self, channel: &Channel) {
        // ---
        let mut subs = self.subscriptions.write().await;
        if let Some(list) = subs.get_mut(channel) {
            list.retain(|s| !s.sender.is_closed());
            if list.is_empty() {
                subs.remove(channel);
            }
        }
    }
}

impl Default for MemoryHub {
    fn default() -> Self {
        // ---
        Self {
            subscriptions: RwLock::new(HashMap::new()),
        }
    }
}

/// Process-global hub used by [`create_memory_transport`].
static GLOBAL_HUB: OnceLock<Arc<MemoryHub>> = OnceLock::new();

fn global_hub() -> Arc<MemoryHub> {
    GLOBAL_HUB.get_or_init(MemoryHub::new).clone()
}

/// In-memory transport.
///
/// Routes envelopes through a shared [`MemoryHub`].
struct MemoryTransport {
    // ---
    base: TransportBase,
    hub: Arc<MemoryHub>,
}

#[async_trait::async_trait]
impl Transport for MemoryTransport {
    // ---
    fn base(&self) -> &TransportBase {
        &self.base
    }

    async fn publish(&self, env: Envelope) -> Result<()> {
        self.hub.publish(self.transport_id(), env).await
    }

    async fn subscribe(&self, channel: Channel) -> Result<SubscriptionHandle> {
        self.hub.subscribe(self.transport_id(), channel).await
    }

    /// Close the transport.
    ///
    /// Removes only the subscriptions this transport created; other
    /// transports on the same hub keep theirs.
    async fn close(&self) -> Result<()> {
        self.hub.close(self.transport_id()).await
    }
}

/// Create a new in-memory transport on the process-global hub.
///
/// All transports created with this function share a single bus. For
/// isolated parallel testing, use [`create_memory_transport_with_hub`].
///
/// # Errors
///
/// Currently infallible, always returns `Ok`.
pub async fn create_memory_transport(transport_id: impl Into<String>) -> Result<TransportPtr> {
    // ---
    create_memory_transport_with_hub(transport_id, global_hub()).await
}

/// Create a new in-memory transport on the provided hub.
///
/// Transport ids should be unique per hub: `close()` removes every
/// subscription made under the closing transport's id.
///
/// # Errors
///
/// Currently infallible, always returns `Ok`.
pub async fn create_memory_transport_with_hub(
    transport_id: impl Into<String>,
    hub: Arc<MemoryHub>,
) -> Result<TransportPtr> {
    // ---
    let base = TransportBase::new(transport_id);
    log_debug!("{}: create memory transport", base.transport_id);

    let transport = MemoryTransport { base, hub };

    Ok(Arc::new(transport))
}
