//! Accrual ledger errors.

use crate::access::Role;
use thiserror::Error;
use tidal_rate::RateError;
use tidal_types::HolderId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("{caller} lacks the {role} role")]
    InsufficientPrivilege { caller: HolderId, role: Role },

    #[error("insufficient balance: need {needed}, available {available}")]
    InsufficientBalance { needed: u128, available: u128 },

    #[error(transparent)]
    Rate(#[from] RateError),

    #[error("the {0} role cannot be granted or revoked")]
    InvalidGrant(Role),

    #[error("arithmetic overflow in accrual computation")]
    Overflow,

    #[error("storage error: {0}")]
    Storage(String),
}
