//! Fixed-point interest rates and the linear growth law.
//!
//! A [`Rate`] is a fraction of principal accrued per second, scaled by
//! [`PRECISION`]. Growth is linear: after `dt` seconds a principal `p` is worth
//! `p * (PRECISION + rate * dt) / PRECISION`, floored.

use crate::error::TypesError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed-point scale shared by rates and growth factors (10^18).
pub const PRECISION: u128 = 1_000_000_000_000_000_000;

/// Seconds in a 365-day year, used to convert annual rates.
pub const SECONDS_PER_YEAR: u128 = 365 * 24 * 3600;

/// Amount sentinel meaning "the holder's entire touched balance".
pub const TRANSFER_ALL: u128 = u128::MAX;

/// Per-second interest rate scaled by [`PRECISION`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Rate(u128);

impl Rate {
    pub const ZERO: Self = Self(0);

    pub const fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Convert an annual rate in basis points (500 = 5%/year) to a per-second rate.
    ///
    /// The result is floored, so tiny annual rates may round down to zero.
    pub fn from_annual_bps(bps: u32) -> Self {
        Self((PRECISION / 10_000) * bps as u128 / SECONDS_PER_YEAR)
    }

    /// Parse a raw per-second rate from its decimal string form.
    pub fn parse_raw(s: &str) -> Result<Self, TypesError> {
        s.trim()
            .parse::<u128>()
            .map(Self)
            .map_err(|e| TypesError::InvalidRate(format!("{s}: {e}")))
    }

    /// `PRECISION + rate * elapsed`. Never below `PRECISION`.
    pub fn growth_factor(&self, elapsed_secs: u64) -> Option<u128> {
        self.0
            .checked_mul(elapsed_secs as u128)?
            .checked_add(PRECISION)
    }

    /// Apply `elapsed_secs` of linear growth to `principal`, flooring the result.
    pub fn grow(&self, principal: u128, elapsed_secs: u64) -> Option<u128> {
        mul_precision(principal, self.growth_factor(elapsed_secs)?)
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/s", self.0)
    }
}

/// `floor(value * factor / PRECISION)` with checked arithmetic.
///
/// `value` is split into `whole * PRECISION + frac` so the wide product is only
/// formed for the sub-`PRECISION` remainder. The result is exact.
pub fn mul_precision(value: u128, factor: u128) -> Option<u128> {
    let whole = value / PRECISION;
    let frac = value % PRECISION;
    let high = whole.checked_mul(factor)?;
    let low = frac.checked_mul(factor)? / PRECISION;
    high.checked_add(low)
}
