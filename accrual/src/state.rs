//! Per-holder accrual state.

use serde::{Deserialize, Serialize};
use tidal_types::{Rate, Timestamp};

/// What the ledger physically stores for one holder.
///
/// Everything else (the live balance, pending interest) is derived from these
/// three fields and the current time.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    /// Materialized amount, excluding interest accrued since `last_touch`.
    pub principal: u128,

    /// Rate at which this holder's balance grows.
    /// Assigned when the balance goes from zero to non-zero, never recomputed.
    pub locked_rate: Rate,

    /// When accrual was last materialized into `principal`.
    pub last_touch: Timestamp,
}

impl AccountState {
    pub fn new(principal: u128, locked_rate: Rate, last_touch: Timestamp) -> Self {
        Self {
            principal,
            locked_rate,
            last_touch,
        }
    }

    /// Live balance at `now`, or `None` on overflow.
    ///
    /// A `now` earlier than `last_touch` counts as zero elapsed time.
    pub fn balance_checked(&self, now: Timestamp) -> Option<u128> {
        self.locked_rate
            .grow(self.principal, self.last_touch.elapsed_since(now))
    }

    /// Interest earned since the last touch.
    pub fn pending_interest_checked(&self, now: Timestamp) -> Option<u128> {
        self.balance_checked(now)?.checked_sub(self.principal)
    }

    /// The state after materializing interest at `now`, with the amount materialized.
    ///
    /// `last_touch` never moves backwards, so a stale `now` cannot make the
    /// same interval accrue twice.
    pub fn touched(&self, now: Timestamp) -> Option<(Self, u128)> {
        let balance = self.balance_checked(now)?;
        let increase = balance.checked_sub(self.principal)?;
        let touched = Self {
            principal: balance,
            locked_rate: self.locked_rate,
            last_touch: self.last_touch.max(now),
        };
        Some((touched, increase))
    }

    pub fn is_empty(&self) -> bool {
        self.principal == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidal_types::PRECISION;

    // 1% per 100s
    const RATE: Rate = Rate::from_raw(PRECISION / 10_000);

    #[test]
    fn balance_grows_linearly() {
        let s = AccountState::new(1_000_000, RATE, Timestamp::new(1000));
        assert_eq!(s.balance_checked(Timestamp::new(1000)), Some(1_000_000));
        assert_eq!(s.balance_checked(Timestamp::new(1100)), Some(1_010_000));
        assert_eq!(s.balance_checked(Timestamp::new(1200)), Some(1_020_000));
    }

    #[test]
    fn stale_now_counts_as_zero_elapsed() {
        let s = AccountState::new(500, RATE, Timestamp::new(1000));
        assert_eq!(s.balance_checked(Timestamp::new(10)), Some(500));
        let (touched, increase) = s.touched(Timestamp::new(10)).unwrap();
        assert_eq!(increase, 0);
        assert_eq!(touched.last_touch, Timestamp::new(1000));
    }

    #[test]
    fn touch_materializes_interest() {
        let s = AccountState::new(1_000_000, RATE, Timestamp::new(0));
        let (touched, increase) = s.touched(Timestamp::new(100)).unwrap();
        assert_eq!(increase, 10_000);
        assert_eq!(touched.principal, 1_010_000);
        assert_eq!(touched.last_touch, Timestamp::new(100));
        assert_eq!(touched.locked_rate, RATE);
    }

    #[test]
    fn second_touch_at_same_instant_is_noop() {
        let s = AccountState::new(1_000_000, RATE, Timestamp::new(0));
        let (once, _) = s.touched(Timestamp::new(250)).unwrap();
        let (twice, increase) = once.touched(Timestamp::new(250)).unwrap();
        assert_eq!(increase, 0);
        assert_eq!(once, twice);
    }

    #[test]
    fn zero_rate_never_accrues() {
        let s = AccountState::new(42, Rate::ZERO, Timestamp::new(0));
        assert_eq!(s.balance_checked(Timestamp::new(u64::MAX)), Some(42));
        assert_eq!(s.pending_interest_checked(Timestamp::new(u64::MAX)), Some(0));
    }

    #[test]
    fn overflow_is_reported() {
        let s = AccountState::new(u128::MAX, Rate::from_raw(PRECISION), Timestamp::new(0));
        assert_eq!(s.balance_checked(Timestamp::new(10)), None);
        assert!(s.touched(Timestamp::new(10)).is_none());
    }
}
