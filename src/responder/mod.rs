/// Responder role: serves routes and sends exactly one reply per request
mod handler;

pub use handler::{Args, HandlerResult};

use crate::{
    // ---
    lock_ignore_poison,
    log_debug,
    log_error,
    log_warn,
    Channel,
    ReplyMessage,
    RequestMessage,
    Result,
    SubscriptionHandle,
    Thrown,
    TransportPtr,
};
use handler::{AsyncHandler, HandlerFn, SyncHandler};
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::{JoinError, JoinHandle};

/// Route table: route name to its single current registration.
type RouteTable = Arc<Mutex<HashMap<String, Registration>>>;

struct Registration {
    id: u64,
    handler: Arc<dyn HandlerFn>,
    listener: JoinHandle<()>,
}

/// Identifies one registration made by [`Responder::on`].
///
/// Removing by token only succeeds while that registration is current; once
/// the route has been re-registered the old token is inert.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteToken {
    route: String,
    id: u64,
}

impl RouteToken {
    /// The route this token was issued for.
    pub fn route(&self) -> &str {
        &self.route
    }
}

/// Serves named routes over a transport.
///
/// Each route has one subscription and one listener task. Every inbound
/// request `[replyChannel, ...args]` runs the route's current handler in its
/// own task and publishes `[status, payload]` on `replyChannel`:
///
/// - `Ok(value)` → `["success", value]`
/// - `Err(thrown)` → `["failure", thrown.serialize()]`
/// - a panic → `["failure", {name: "Error", message: <panic message>}]`
///
/// Registering a route again replaces its handler; the last registration
/// wins. Clones share the route table.
///
/// # Example
///
/// ```no_run
/// use promise_ipc::{create_memory_transport, Args, Responder, Thrown};
///
/// # async fn example() -> promise_ipc::Result<()> {
/// let transport = create_memory_transport("main").await?;
/// let responder = Responder::new(transport);
///
/// responder
///     .on("math/add", |args: Args| async move {
///         let a: i64 = args.parse(0)?;
///         let b: i64 = args.parse(1)?;
///         Ok::<_, Thrown>(a + b)
///     })
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Responder {
    inner: Arc<Inner>,
}

struct Inner {
    transport: TransportPtr,
    routes: RouteTable,
    next_id: AtomicU64,
}

impl Responder {
    // ---

    /// Create a responder with no routes.
    pub fn new(transport: TransportPtr) -> Self {
        // ---
        Self {
            inner: Arc::new(Inner {
                transport,
                routes: Arc::new(Mutex::new(HashMap::new())),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Register an async handler for `route`, replacing any previous one.
    ///
    /// The handler receives the call's arguments and settles once; its
    /// success value must be serializable.
    ///
    /// # Errors
    ///
    /// Returns an error if subscribing to the route fails.
    pub async fn on<F, Fut, R>(&self, route: &str, handler: F) -> Result<RouteToken>
    where
        F: Fn(Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<R, Thrown>> + Send + 'static,
        R: Serialize + Send + 'static,
    {
        self.install(route, Arc::new(AsyncHandler::new(handler)))
            .await
    }

    /// Register a handler that returns its outcome directly.
    ///
    /// # Errors
    ///
    /// Returns an error if subscribing to the route fails.
    pub async fn on_sync<F, R>(&self, route: &str, handler: F) -> Result<RouteToken>
    where
        F: Fn(Args) -> std::result::Result<R, Thrown> + Send + Sync + 'static,
        R: Serialize + Send + 'static,
    {
        self.install(route, Arc::new(SyncHandler::new(handler)))
            .await
    }

    /// Remove the registration for `route` and stop listening on it.
    ///
    /// Returns false if nothing was registered. Requests already being
    /// handled still get their reply.
    pub fn off(&self, route: &str) -> bool {
        // ---
        let removed = lock_ignore_poison(&self.inner.routes).remove(route);
        match removed {
            Some(registration) => {
                registration.listener.abort();
                log_debug!("{}: off {route}", self.inner.transport.transport_id());
                true
            }
            None => false,
        }
    }

    /// Remove the registration `token` was issued for, if it is still current.
    pub fn remove(&self, token: &RouteToken) -> bool {
        // ---
        let removed = {
            let mut routes = lock_ignore_poison(&self.inner.routes);
            let is_current = routes
                .get(&token.route)
                .is_some_and(|current| current.id == token.id);
            if is_current {
                routes.remove(&token.route)
            } else {
                None
            }
        };

        match removed {
            Some(registration) => {
                registration.listener.abort();
                true
            }
            None => false,
        }
    }

    /// Registered route names, sorted.
    pub fn routes(&self) -> Vec<String> {
        let mut names: Vec<String> = lock_ignore_poison(&self.inner.routes)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Remove every registration and stop all listeners.
    pub fn shutdown(&self) {
        // ---
        let drained: Vec<Registration> = lock_ignore_poison(&self.inner.routes)
            .drain()
            .map(|(_, registration)| registration)
            .collect();

        for registration in drained {
            registration.listener.abort();
        }
    }

    async fn install(&self, route: &str, handler: Arc<dyn HandlerFn>) -> Result<RouteToken> {
        // ---
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let token = RouteToken {
            route: route.to_string(),
            id,
        };

        if self.replace_handler(route, id, &handler) {
            log_debug!(
                "{}: replaced handler for {route}",
                self.inner.transport.transport_id()
            );
            return Ok(token);
        }

        let subscription = self
            .inner
            .transport
            .subscribe(Channel::from(route))
            .await?;

        {
            let mut routes = lock_ignore_poison(&self.inner.routes);
            match routes.get_mut(route) {
                // Another registration for this route won the race while we
                // were subscribing; take its place and let our handle drop.
                Some(current) => {
                    current.id = id;
                    current.handler = handler;
                }
                None => {
                    let listener = spawn_listener(
                        route.to_string(),
                        subscription,
                        self.inner.transport.clone(),
                        self.inner.routes.clone(),
                    );
                    routes.insert(
                        route.to_string(),
                        Registration {
                            id,
                            handler,
                            listener,
                        },
                    );
                }
            }
        }

        log_debug!("{}: on {route}", self.inner.transport.transport_id());
        Ok(token)
    }

    fn replace_handler(&self, route: &str, id: u64, handler: &Arc<dyn HandlerFn>) -> bool {
        // ---
        let mut routes = lock_ignore_poison(&self.inner.routes);
        match routes.get_mut(route) {
            Some(current) => {
                current.id = id;
                current.handler = handler.clone();
                true
            }
            None => false,
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        for registration in lock_ignore_poison(&self.routes).values() {
            registration.listener.abort();
        }
    }
}

// Receive loop for one route. The handler is looked up per request so that
// re-registration takes effect without re-subscribing.
fn spawn_listener(
    route: String,
    mut subscription: SubscriptionHandle,
    transport: TransportPtr,
    routes: RouteTable,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(env) = subscription.inbox.recv().await {
            let request = match RequestMessage::decode(&env) {
                Ok(request) => request,
                Err(_err) => {
                    log_warn!("{route}: dropping request without reply channel: {_err}");
                    continue;
                }
            };

            let handler = {
                let routes = lock_ignore_poison(&routes);
                routes.get(&route).map(|r| r.handler.clone())
            };

            let handler = match handler {
                Some(h) => h,
                None => {
                    log_debug!("{route}: no handler registered, dropping request");
                    continue;
                }
            };

            tokio::spawn(serve_request(transport.clone(), handler, request));
        }

        log_debug!("listener for {route} stopped");
    })
}

async fn serve_request(
    transport: TransportPtr,
    handler: Arc<dyn HandlerFn>,
    request: RequestMessage,
) {
    // ---
    let RequestMessage {
        reply_channel,
        args,
    } = request;

    // The handler runs in its own task so that a panic, even one raised
    // before its future is built, becomes a failure reply.
    let outcome = tokio::spawn(async move { handler.call(Args::from(args)).await }).await;

    let reply = match outcome {
        Ok(Ok(value)) => ReplyMessage::success(value),
        Ok(Err(thrown)) => ReplyMessage::failure(thrown.serialize()),
        Err(join_err) => {
            let message = abort_message(join_err);
            log_error!("handler for {reply_channel} failed: {message}");
            ReplyMessage::failure(Thrown::error(message).serialize())
        }
    };

    let env = match reply.into_envelope(reply_channel) {
        Ok(env) => env,
        Err(_err) => {
            log_error!("failed to encode reply: {_err}");
            return;
        }
    };

    if let Err(_err) = transport.publish(env).await {
        log_error!("failed to publish reply: {_err}");
    }
}

fn abort_message(err: JoinError) -> String {
    // ---
    if !err.is_panic() {
        return "handler task was cancelled".to_string();
    }

    let payload = err.into_panic();
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "handler panicked".to_string()
    }
}
