use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Unique correlation token linking one request to its single reply.
///
/// The token is embedded in the reply channel name (`"<route>#<token>"`),
/// so it is carried in-band and stays opaque to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Generate a new unique correlation ID (UUID v4).
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrow the correlation ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for CorrelationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for CorrelationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<Uuid> for CorrelationId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid.to_string())
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of correlation tokens for outgoing calls.
///
/// Tokens must be collision-resistant across every call in flight on the
/// same bus. Any `Fn() -> CorrelationId` closure is a token source, which
/// lets tests pin the reply channel name.
pub trait TokenSource: Send + Sync {
    /// Produce the token for the next call.
    fn next_token(&self) -> CorrelationId;
}

impl<F> TokenSource for F
where
    F: Fn() -> CorrelationId + Send + Sync,
{
    fn next_token(&self) -> CorrelationId {
        self()
    }
}

/// Default token source: a fresh UUID v4 per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidTokens;

impl TokenSource for UuidTokens {
    fn next_token(&self) -> CorrelationId {
        CorrelationId::generate()
    }
}

/// Shared token source pointer.
pub type TokenSourcePtr = Arc<dyn TokenSource>;
