//! Rate registry errors.

use thiserror::Error;
use tidal_types::{Rate, Timestamp};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RateError {
    #[error("rate increase rejected: current {current}, requested {requested}")]
    RateIncreaseRejected { current: Rate, requested: Rate },

    #[error("rate change at {at} precedes the last change at {last}")]
    InvalidTimestamp { at: Timestamp, last: Timestamp },
}
