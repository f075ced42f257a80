//! Abstract storage traits for the Tidal ledger.
//!
//! Storage backends implement these traits; the ledger and bridge crates
//! depend only on the traits and serialize their own types.

pub mod error;
pub mod ledger;

pub use error::StoreError;
pub use ledger::LedgerStore;
