/// Caller role: sends a request and awaits its single settlement
mod pending;

use crate::error::from_failure_payload;
use crate::{
    // ---
    lock_ignore_poison,
    log_debug,
    reply_channel,
    IpcConfig,
    ReplyMessage,
    RequestMessage,
    Result,
    RpcError,
    Status,
    TokenSource,
    TokenSourcePtr,
    TransportPtr,
    UuidTokens,
};
use pending::{PendingCall, PendingCalls, PendingCallsPtr, PendingGuard};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Issues calls over a transport and resolves each one exactly once.
///
/// Every call gets its own reply channel, `"<route>#<token>"`, subscribed
/// for that call only. The call settles on the first of:
///
/// - a reply on the reply channel
/// - the timeout, when one is configured
///
/// Settlement drops the reply subscription and the timer together, so a
/// late or duplicate reply finds nobody listening and has no effect.
///
/// Clones share the transport, configuration and pending-call registry.
///
/// # Example
///
/// ```no_run
/// use promise_ipc::{create_memory_transport, Caller};
/// use serde_json::json;
///
/// # async fn example() -> promise_ipc::Result<()> {
/// let transport = create_memory_transport("renderer").await?;
/// let caller = Caller::new(transport);
///
/// let sum = caller.send("math/add", vec![json!(2), json!(3)]).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Caller {
    inner: Arc<Inner>,
}

struct Inner {
    transport: TransportPtr,
    config: IpcConfig,
    tokens: TokenSourcePtr,
    pending: PendingCallsPtr,
}

impl Caller {
    // ---

    /// Create a caller with the default configuration (no timeout).
    pub fn new(transport: TransportPtr) -> Self {
        Self::with_config(transport, IpcConfig::default())
    }

    /// Create a caller with an explicit configuration.
    pub fn with_config(transport: TransportPtr, config: IpcConfig) -> Self {
        Self::with_token_source(transport, config, UuidTokens)
    }

    /// Create a caller that draws correlation tokens from `tokens`.
    ///
    /// Mostly useful in tests, to make reply channel names predictable.
    pub fn with_token_source<S>(transport: TransportPtr, config: IpcConfig, tokens: S) -> Self
    where
        S: TokenSource + 'static,
    {
        Self::from_parts(transport, config, Arc::new(tokens))
    }

    pub(crate) fn from_parts(
        transport: TransportPtr,
        config: IpcConfig,
        tokens: TokenSourcePtr,
    ) -> Self {
        // ---
        Self {
            inner: Arc::new(Inner {
                transport,
                config,
                tokens,
                pending: Arc::new(Mutex::new(PendingCalls::new())),
            }),
        }
    }

    /// The configuration this caller was built with.
    pub fn config(&self) -> &IpcConfig {
        &self.inner.config
    }

    /// Number of calls currently waiting for a reply or a timeout.
    pub fn pending_count(&self) -> usize {
        lock_ignore_poison(&self.inner.pending).len()
    }

    /// Call the handler registered on `route` with `args`.
    ///
    /// Uses the configured `max_timeout`. Nothing is published until the
    /// returned future is first polled.
    ///
    /// # Errors
    ///
    /// - [`RpcError::Remote`] / [`RpcError::Rejected`] when the handler failed
    /// - [`RpcError::UnexpectedStatus`] when the reply status is unknown
    /// - [`RpcError::Timeout`] when the timeout fires first
    /// - [`RpcError::Transport`] when the reply subscription closes early
    pub async fn send(&self, route: &str, args: Vec<Value>) -> Result<Value> {
        self.dispatch(route, args, self.inner.config.max_timeout)
            .await
    }

    /// Like [`send`](Self::send) with a timeout for this call only.
    pub async fn send_with_timeout(
        &self,
        route: &str,
        args: Vec<Value>,
        timeout: Duration,
    ) -> Result<Value> {
        self.dispatch(route, args, Some(timeout)).await
    }

    /// Like [`send`](Self::send), deserializing the success value into `T`.
    pub async fn call<T>(&self, route: &str, args: Vec<Value>) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let value = self.send(route, args).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn dispatch(
        &self,
        route: &str,
        args: Vec<Value>,
        timeout: Option<Duration>,
    ) -> Result<Value> {
        // ---
        // The timer starts at send time and covers subscribe and publish
        // too: a transport stuck on backpressure still times out.
        let deadline = timeout.map(|limit| Instant::now() + limit);

        let transport = &self.inner.transport;
        let token = self.inner.tokens.next_token();
        let reply = reply_channel(route, &token);

        let guard = PendingGuard::register(
            self.inner.pending.clone(),
            PendingCall::new(token, route, reply.clone()),
        )?;

        let exchange = async {
            // Subscribe before publishing so the reply cannot outrun us.
            let mut subscription = transport.subscribe(reply.clone()).await?;

            let request = RequestMessage {
                reply_channel: reply.clone(),
                args,
            }
            .into_envelope(route)?;

            log_debug!(
                "{}: call {route}, reply on {reply}",
                transport.transport_id()
            );
            transport.publish(request).await?;

            Ok::<_, RpcError>(subscription.inbox.recv().await)
        };

        // First event wins. The exchange future owns the reply subscription,
        // so finishing or dropping it releases the subscription too.
        let outcome = match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, exchange).await.ok(),
            None => Some(exchange.await),
        };

        if let Some(_call) = guard.settle() {
            log_debug!(
                "{}: settled {} ({})",
                transport.transport_id(),
                _call.reply_channel,
                _call.id
            );
        }

        match outcome {
            None => {
                log_debug!("{}: {route} timed out", transport.transport_id());
                Err(RpcError::Timeout {
                    route: route.to_string(),
                })
            }
            Some(Err(err)) => Err(err),
            Some(Ok(None)) => Err(RpcError::Transport(format!(
                "reply channel {reply} closed before a reply arrived"
            ))),
            Some(Ok(Some(env))) => settle_reply(route, ReplyMessage::decode(&env)?),
        }
    }
}

/// Map a decoded reply onto the call's outcome.
fn settle_reply(route: &str, reply: ReplyMessage) -> Result<Value> {
    // ---
    match reply.status() {
        Some(Status::Success) => Ok(reply.payload),
        Some(Status::Failure) => Err(from_failure_payload(reply.payload)),
        None => Err(RpcError::UnexpectedStatus {
            status: reply.status,
            route: route.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_reply_resolves_payload() {
        // ---
        let value = settle_reply("route", ReplyMessage::success(json!("result"))).unwrap();
        assert_eq!(value, json!("result"));
    }

    #[test]
    fn test_failure_reply_rebuilds_error() {
        // ---
        let err = settle_reply(
            "route",
            ReplyMessage::failure(json!({"name": "Error", "message": "an error message"})),
        )
        .unwrap_err();
        assert!(matches!(err, RpcError::Remote(_)));
        assert_eq!(err.to_string(), "an error message");
    }

    #[test]
    fn test_unknown_status_is_protocol_violation() {
        // ---
        let reply = ReplyMessage {
            status: "unrecognized".into(),
            payload: json!("an error message"),
        };
        let err = settle_reply("route", reply).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unexpected IPC call status \"unrecognized\" in route"
        );
    }
}
