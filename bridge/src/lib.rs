//! Bridge: moving value and its locked rate between two independent ledgers.
//!
//! Outbound: touch and debit the sender on the source ledger, then emit a
//! message carrying the amount and the sender's locked rate.
//! Inbound: reject replays by `(source_chain, nonce)`, then credit the
//! beneficiary with the carried rate (adopted only if its balance was zero).
//!
//! Debit-before-send plus idempotent credit gives at-least-once delivery with
//! at-most-once effect. The two ledgers share nothing but encoded frames.

pub mod consumed;
pub mod coordinator;
pub mod error;
pub mod message;

pub use consumed::ConsumedNonces;
pub use coordinator::{BridgeCoordinator, InboundReceipt, OutboundReceipt};
pub use error::BridgeError;
pub use message::{BridgeMessage, MAX_FRAME_BYTES, WIRE_VERSION};
