use thiserror::Error;
use tidal_accrual::LedgerError;
use tidal_types::HolderId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VaultError {
    #[error("{holder} holds {available} native units, needs {needed}")]
    InsufficientFunds {
        holder: HolderId,
        needed: u128,
        available: u128,
    },

    #[error("reserve holds {available}, cannot release {needed}")]
    InsufficientReserves { needed: u128, available: u128 },

    #[error("vault amount must be non-zero")]
    ZeroAmount,

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("arithmetic overflow")]
    Overflow,
}
