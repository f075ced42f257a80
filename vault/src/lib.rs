//! Vault: the boundary between a chain's native asset and its accrual ledger.
//!
//! A deposit takes native value into the reserve and mints ledger balance at
//! the chain's current global rate. A withdrawal burns ledger balance
//! (interest included) and releases the same amount of native value. Interest
//! is paid out of reserve value added with [`LocalReserve::fund_rewards`].

pub mod error;
pub mod reserve;
pub mod vault;

pub use error::VaultError;
pub use reserve::{LocalReserve, NativeReserve};
pub use vault::Vault;
