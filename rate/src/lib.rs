//! The interest-rate registry.
//!
//! One registry per chain holds the current global rate. It is the only place
//! a rate is authored from scratch; everywhere else a rate is copied from an
//! account or carried in a bridge message.
//!
//! The rate may only go down (or stay level). Every accepted change is kept in
//! an append-only history.

pub mod error;
pub mod registry;

pub use error::RateError;
pub use registry::{RateChange, RateRegistry};
