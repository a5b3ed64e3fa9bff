use crate::{lock_ignore_poison, Channel, CorrelationId, Result, RpcError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Bookkeeping for one outstanding call.
#[derive(Debug, Clone)]
pub(crate) struct PendingCall {
    // ---
    pub id: CorrelationId,
    pub route: String,
    pub reply_channel: Channel,
    settled: bool,
}

impl PendingCall {
    pub fn new(id: CorrelationId, route: impl Into<String>, reply_channel: Channel) -> Self {
        Self {
            id,
            route: route.into(),
            reply_channel,
            settled: false,
        }
    }

    /// Mark the call settled.
    ///
    /// Returns true only the first time; every later call is a no-op.
    pub fn settle(&mut self) -> bool {
        // ---
        if self.settled {
            return false;
        }
        self.settled = true;
        true
    }

    pub fn is_settled(&self) -> bool {
        self.settled
    }
}

/// Tracks calls waiting for a reply or a timeout, keyed by reply channel.
///
/// The reply channel is the unit of uniqueness on the bus: one token reused
/// across different routes yields distinct channels and does not collide.
pub(crate) struct PendingCalls {
    // ---
    calls: HashMap<Channel, PendingCall>,
}

impl PendingCalls {
    // ---

    pub fn new() -> Self {
        // ---
        Self {
            calls: HashMap::new(),
        }
    }

    /// Register a new outstanding call.
    ///
    /// Fails if a call on the same reply channel is still in flight.
    pub fn register(&mut self, call: PendingCall) -> Result<()> {
        // ---
        if self.calls.contains_key(&call.reply_channel) {
            return Err(RpcError::CorrelationInUse(call.reply_channel.to_string()));
        }
        self.calls.insert(call.reply_channel.clone(), call);
        Ok(())
    }

    /// Settle and discard a call.
    ///
    /// Returns the record only for the first settlement of a registered
    /// call; unknown or already-settled channels yield `None`.
    pub fn settle(&mut self, reply_channel: &Channel) -> Option<PendingCall> {
        // ---
        let mut call = self.calls.remove(reply_channel)?;
        call.settle().then_some(call)
    }

    #[cfg(test)]
    pub fn contains(&self, reply_channel: &Channel) -> bool {
        self.calls.contains_key(reply_channel)
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }
}

pub(crate) type PendingCallsPtr = Arc<Mutex<PendingCalls>>;

/// Scoped registration of one pending call.
///
/// Settling through the guard is the normal path; if the guard is dropped
/// first (the call future was dropped, or sending failed) the record is
/// still removed.
pub(crate) struct PendingGuard {
    pending: PendingCallsPtr,
    reply_channel: Channel,
}

impl PendingGuard {
    pub fn register(pending: PendingCallsPtr, call: PendingCall) -> Result<Self> {
        // ---
        let reply_channel = call.reply_channel.clone();
        lock_ignore_poison(&pending).register(call)?;
        Ok(Self {
            pending,
            reply_channel,
        })
    }

    /// Settle the guarded call. `None` means it was already settled.
    pub fn settle(&self) -> Option<PendingCall> {
        lock_ignore_poison(&self.pending).settle(&self.reply_channel)
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        lock_ignore_poison(&self.pending).settle(&self.reply_channel);
    }
}
