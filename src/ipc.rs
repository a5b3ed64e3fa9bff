//! Combined endpoint.
//!
//! Provides a single type that can both issue calls and serve routes over
//! one transport, the way either side of an IPC pipe usually needs to.

use crate::{
    // ---
    Args,
    Caller,
    IpcConfig,
    Responder,
    Result,
    RouteToken,
    Thrown,
    TransportPtr,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

/// A caller and a responder sharing one transport.
///
/// Build one with [`PromiseIpc::new`] for the defaults or with
/// [`PromiseIpcBuilder`](crate::PromiseIpcBuilder) to set a timeout or a
/// token source. Clones share all state.
///
/// # Example
///
/// ```no_run
/// use promise_ipc::{create_memory_transport, Args, PromiseIpc, Thrown};
/// use serde_json::json;
///
/// # async fn example() -> promise_ipc::Result<()> {
/// let ipc = PromiseIpc::new(create_memory_transport("node").await?);
///
/// ipc.on("echo", |args: Args| async move { Ok::<_, Thrown>(args.into_vec()) })
///     .await?;
///
/// let echoed = ipc.send("echo", vec![json!("hi")]).await?;
/// assert_eq!(echoed, json!(["hi"]));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct PromiseIpc {
    transport: TransportPtr,
    caller: Caller,
    responder: Responder,
}

impl PromiseIpc {
    /// Create an endpoint with the default configuration (no timeout).
    pub fn new(transport: TransportPtr) -> Self {
        Self::from_parts(
            transport.clone(),
            Caller::new(transport.clone()),
            Responder::new(transport),
        )
    }

    pub(crate) fn from_parts(
        transport: TransportPtr,
        caller: Caller,
        responder: Responder,
    ) -> Self {
        Self {
            transport,
            caller,
            responder,
        }
    }

    /// The calling half.
    pub fn caller(&self) -> &Caller {
        &self.caller
    }

    /// The serving half.
    pub fn responder(&self) -> &Responder {
        &self.responder
    }

    /// The configuration calls are made with.
    pub fn config(&self) -> &IpcConfig {
        self.caller.config()
    }

    /// See [`Caller::send`].
    pub async fn send(&self, route: &str, args: Vec<Value>) -> Result<Value> {
        self.caller.send(route, args).await
    }

    /// See [`Caller::send_with_timeout`].
    pub async fn send_with_timeout(
        &self,
        route: &str,
        args: Vec<Value>,
        timeout: Duration,
    ) -> Result<Value> {
        self.caller.send_with_timeout(route, args, timeout).await
    }

    /// See [`Caller::call`].
    pub async fn call<T>(&self, route: &str, args: Vec<Value>) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.caller.call(route, args).await
    }

    /// See [`Responder::on`].
    pub async fn on<F, Fut, R>(&self, route: &str, handler: F) -> Result<RouteToken>
    where
        F: Fn(Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<R, Thrown>> + Send + 'static,
        R: Serialize + Send + 'static,
    {
        self.responder.on(route, handler).await
    }

    /// See [`Responder::on_sync`].
    pub async fn on_sync<F, R>(&self, route: &str, handler: F) -> Result<RouteToken>
    where
        F: Fn(Args) -> std::result::Result<R, Thrown> + Send + Sync + 'static,
        R: Serialize + Send + 'static,
    {
        self.responder.on_sync(route, handler).await
    }

    /// See [`Responder::off`].
    pub fn off(&self, route: &str) -> bool {
        self.responder.off(route)
    }

    /// See [`Responder::remove`].
    pub fn remove(&self, token: &RouteToken) -> bool {
        self.responder.remove(token)
    }

    /// Number of calls still waiting for a reply or a timeout.
    pub fn pending_count(&self) -> usize {
        self.caller.pending_count()
    }

    /// Stop serving every route and close the transport.
    ///
    /// Calls still in flight observe their reply subscription closing and
    /// fail with [`RpcError::Transport`](crate::RpcError::Transport).
    pub async fn shutdown(&self) -> Result<()> {
        // ---
        self.responder.shutdown();
        self.transport.close().await
    }
}
