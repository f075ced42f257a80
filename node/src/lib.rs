//! Tidal chain node.
//!
//! A [`ChainNode`] owns one chain's accrual ledger together with its bridge
//! coordinator, vault, native reserve and clock, and is the unit the runtime
//! schedules. [`runtime::spawn_chain`] runs a node as a tokio task; chains
//! talk to each other only through encoded bridge frames carried by a
//! [`RelayChannel`].

pub mod chain_node;
pub mod config;
pub mod error;
pub mod runtime;
pub mod shutdown;

pub use chain_node::{ChainNode, ChainSummary, STAT_NAMES};
pub use config::ChainConfig;
pub use error::NodeError;
pub use runtime::{spawn_chain, ChainCommand, ChainHandle, Mailbox, RelayChannel};
pub use shutdown::ShutdownController;
