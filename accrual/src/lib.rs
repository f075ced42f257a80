//! Accrual ledger: balances that grow linearly at a per-holder locked rate.
//!
//! Only a point-in-time principal, a locked rate and a last-touch timestamp
//! are stored per holder:
//! `balance = principal × (PRECISION + rate × (now − last_touch)) / PRECISION`
//!
//! This crate handles:
//! - Pure balance reads at any instant
//! - Touching (materializing interest into principal)
//! - Mint, burn and transfer with the rate-adoption rules
//! - Role checks for privileged operations
//! - Ledger events for observers

pub mod access;
pub mod error;
pub mod events;
pub mod ledger;
pub mod state;

pub use access::{AccessControl, Role};
pub use error::LedgerError;
pub use events::{EventBus, LedgerEvent};
pub use ledger::AccrualLedger;
pub use state::AccountState;
