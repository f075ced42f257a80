//! Bridge errors.

use thiserror::Error;
use tidal_accrual::LedgerError;
use tidal_types::{ChainId, ChannelError};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BridgeError {
    #[error("message from {source_chain} with nonce {nonce} was already consumed")]
    ReplayedMessage { source_chain: ChainId, nonce: u64 },

    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("{0} is not a bridge peer of this chain")]
    UnsupportedChain(ChainId),

    #[error("bridge amount must be non-zero")]
    ZeroAmount,

    #[error("coordinator for {expected} was handed the ledger of {actual}")]
    LedgerMismatch { expected: ChainId, actual: ChainId },

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("nonce space exhausted")]
    Overflow,

    #[error("storage error: {0}")]
    Storage(String),
}

impl BridgeError {
    /// Whether a rejected delivery may succeed later with the same frame
    /// (a missing role, a balance overflow), as opposed to never succeeding.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BridgeError::Ledger(_) | BridgeError::Overflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidal_accrual::Role;
    use tidal_types::HolderId;

    #[test]
    fn only_ledger_failures_are_retryable() {
        let privilege = BridgeError::Ledger(LedgerError::InsufficientPrivilege {
            caller: HolderId::new("tdl_bridge"),
            role: Role::MintBurn,
        });
        assert!(privilege.is_retryable());
        assert!(BridgeError::Overflow.is_retryable());
        assert!(!BridgeError::ReplayedMessage { source_chain: ChainId::new(1), nonce: 0 }.is_retryable());
        assert!(!BridgeError::MalformedMessage("junk".into()).is_retryable());
        assert!(!BridgeError::UnsupportedChain(ChainId::new(9)).is_retryable());
    }
}
