//! Domain layer public interface.
//!
//! This module defines the bus-level abstractions the protocol roles rely
//! on, independent of any concrete transport.
//!
//! All domain consumers must import symbols via this module, not by
//! referencing individual files directly.

mod transport;

// --- Transport domain re-exports ---

pub use transport::{
    //
    Channel,
    Envelope,
    SubscriptionHandle,
    Transport,
    TransportBase,
    TransportPtr,
};
