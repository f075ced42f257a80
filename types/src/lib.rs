//! Fundamental types for the Tidal ledger.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! holder identities, chain identifiers, fixed-point rates, timestamps, message ids
//! and the outbound channel abstraction.

pub mod chain;
pub mod channel;
pub mod error;
pub mod holder;
pub mod message_id;
pub mod rate;
pub mod time;

pub use chain::ChainId;
pub use channel::{ChannelError, MessageChannel};
pub use error::TypesError;
pub use holder::HolderId;
pub use message_id::MessageId;
pub use rate::{mul_precision, Rate, PRECISION, SECONDS_PER_YEAR, TRANSFER_ALL};
pub use time::{Clock, SystemClock, Timestamp};
