//! Per-instance call configuration.
//!
//! This type intentionally contains no transport-specific settings; the
//! transport is chosen separately and handed to the builder.

use std::time::Duration;

/// Configuration for the caller side of a [`PromiseIpc`](crate::PromiseIpc).
///
/// # Example
///
/// ```
/// use promise_ipc::IpcConfig;
/// use std::time::Duration;
///
/// let config = IpcConfig::default().with_max_timeout_ms(5000);
/// assert_eq!(config.max_timeout, Some(Duration::from_millis(5000)));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IpcConfig {
    /// Longest time a call waits for its reply.
    ///
    /// `None` (the default) waits indefinitely. When set, a timer is armed
    /// per call at send time and the call rejects with
    /// [`RpcError::Timeout`](crate::RpcError::Timeout) if it fires first.
    pub max_timeout: Option<Duration>,
}

impl IpcConfig {
    /// A configuration without any timeout.
    pub fn unbounded() -> Self {
        Self { max_timeout: None }
    }

    /// Set the per-call timeout.
    pub fn with_max_timeout(mut self, timeout: Duration) -> Self {
        self.max_timeout = Some(timeout);
        self
    }

    /// Set the per-call timeout in milliseconds.
    pub fn with_max_timeout_ms(self, millis: u64) -> Self {
        self.with_max_timeout(Duration::from_millis(millis))
    }
}
