//! The one-way message channel between chains.
//!
//! The channel carries opaque frames. It guarantees at-least-once delivery and
//! integrity, but not ordering across different messages; the receiving side
//! is responsible for idempotency.

use crate::chain::ChainId;
use crate::message_id::MessageId;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("no route to {0}")]
    NoRoute(ChainId),

    #[error("channel closed")]
    Closed,

    #[error("channel rejected message: {0}")]
    Rejected(String),
}

/// Outbound side of the bridge transport.
pub trait MessageChannel {
    /// Hand a frame to the transport for delivery to `dest`. Fire-and-forget.
    fn send(&mut self, dest: ChainId, frame: Vec<u8>) -> Result<MessageId, ChannelError>;
}
