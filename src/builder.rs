//! Endpoint builder.
//!
//! Provides a fluent builder API for configuring [`PromiseIpc`] instances
//! with a timeout and a correlation token source.

use crate::{
    // ---
    Caller,
    IpcConfig,
    PromiseIpc,
    Responder,
    TokenSource,
    TokenSourcePtr,
    TransportPtr,
    UuidTokens,
};
use std::sync::Arc;
use std::time::Duration;

/// Builder for [`PromiseIpc`] endpoints.
///
/// # Examples
///
/// ## Calls that give up after five seconds
/// ```no_run
/// use promise_ipc::{create_memory_transport, PromiseIpcBuilder};
///
/// # async fn example() -> promise_ipc::Result<()> {
/// let transport = create_memory_transport("renderer").await?;
///
/// let ipc = PromiseIpcBuilder::new(transport)
///     .max_timeout_ms(5000)
///     .build();
/// # Ok(())
/// # }
/// ```
///
/// ## Deterministic reply channels for tests
/// ```no_run
/// use promise_ipc::{create_memory_transport, CorrelationId, PromiseIpcBuilder};
///
/// # async fn example() -> promise_ipc::Result<()> {
/// let transport = create_memory_transport("renderer").await?;
///
/// let ipc = PromiseIpcBuilder::new(transport)
///     .token_source(|| CorrelationId::from("totally_random_uuid"))
///     .build();
/// # Ok(())
/// # }
/// ```
pub struct PromiseIpcBuilder {
    // ---
    transport: TransportPtr,
    config: IpcConfig,
    tokens: Option<TokenSourcePtr>,
}

impl PromiseIpcBuilder {
    /// Create a builder over `transport` with the default configuration.
    pub fn new(transport: TransportPtr) -> Self {
        // ---
        Self {
            transport,
            config: IpcConfig::default(),
            tokens: None,
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: IpcConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the per-call timeout.
    ///
    /// Default: none, calls wait indefinitely.
    pub fn max_timeout(mut self, timeout: Duration) -> Self {
        self.config.max_timeout = Some(timeout);
        self
    }

    /// Set the per-call timeout in milliseconds.
    pub fn max_timeout_ms(self, millis: u64) -> Self {
        self.max_timeout(Duration::from_millis(millis))
    }

    /// Draw correlation tokens from `tokens` instead of random UUIDs.
    pub fn token_source<S>(mut self, tokens: S) -> Self
    where
        S: TokenSource + 'static,
    {
        let tokens: TokenSourcePtr = Arc::new(tokens);
        self.tokens = Some(tokens);
        self
    }

    /// Build the endpoint (consumes self).
    pub fn build(self) -> PromiseIpc {
        // ---
        let tokens: TokenSourcePtr = match self.tokens {
            Some(tokens) => tokens,
            None => Arc::new(UuidTokens),
        };

        let caller = Caller::from_parts(self.transport.clone(), self.config, tokens);
        let responder = Responder::new(self.transport.clone());

        PromiseIpc::from_parts(self.transport, caller, responder)
    }
}
