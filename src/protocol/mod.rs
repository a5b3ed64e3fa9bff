/// Correlation protocol shared by the caller and responder roles
///
/// This module defines the positional wire format for requests and replies,
/// the reply-channel naming rule, and the snapshot rule for rejection values.
mod message;
mod thrown;

pub use message::{reply_channel, ReplyMessage, RequestMessage, Status, REPLY_CHANNEL_SEPARATOR};
pub use thrown::{
    ObjectRef, Thrown, WeakObjectRef, CIRCULAR_SENTINEL, DEPTH_SENTINEL, FUNCTION_SENTINEL,
    MAX_DEPTH,
};
