//! Current global rate and its change history.

use crate::error::RateError;
use serde::{Deserialize, Serialize};
use tidal_types::{Rate, Timestamp};

/// One accepted rate change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateChange {
    pub previous: Rate,
    pub rate: Rate,
    pub at: Timestamp,
}

/// Per-chain global rate, non-increasing over its lifetime.
///
/// The first history entry is the genesis rate (`previous == rate`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RateRegistry {
    current: Rate,
    history: Vec<RateChange>,
}

impl RateRegistry {
    pub fn new(initial_rate: Rate, genesis: Timestamp) -> Self {
        Self {
            current: initial_rate,
            history: vec![RateChange {
                previous: initial_rate,
                rate: initial_rate,
                at: genesis,
            }],
        }
    }

    /// The rate assigned to accounts that go from zero to non-zero via a local mint.
    pub fn current_rate(&self) -> Rate {
        self.current
    }

    /// Lower (or re-affirm) the global rate.
    ///
    /// Fails with [`RateError::RateIncreaseRejected`] if `new_rate` is above the
    /// current rate; the registry is left unchanged on failure. Changes must be
    /// recorded in time order.
    pub fn set_rate(&mut self, new_rate: Rate, at: Timestamp) -> Result<RateChange, RateError> {
        if new_rate > self.current {
            tracing::warn!(
                current = %self.current,
                requested = %new_rate,
                "rejected global rate increase"
            );
            return Err(RateError::RateIncreaseRejected {
                current: self.current,
                requested: new_rate,
            });
        }
        if let Some(last) = self.history.last() {
            if at < last.at {
                return Err(RateError::InvalidTimestamp { at, last: last.at });
            }
        }
        let change = RateChange {
            previous: self.current,
            rate: new_rate,
            at,
        };
        self.current = new_rate;
        self.history.push(change.clone());
        tracing::info!(previous = %change.previous, rate = %change.rate, at = %at, "global rate changed");
        Ok(change)
    }

    /// All accepted changes, genesis first.
    pub fn history(&self) -> &[RateChange] {
        &self.history
    }
}

impl Default for RateRegistry {
    fn default() -> Self {
        Self::new(Rate::ZERO, Timestamp::EPOCH)
    }
}
