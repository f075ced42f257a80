use thiserror::Error;
use tidal_types::ChainId;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("ledger error: {0}")]
    Ledger(#[from] tidal_accrual::LedgerError),

    #[error("bridge error: {0}")]
    Bridge(#[from] tidal_bridge::BridgeError),

    #[error("vault error: {0}")]
    Vault(#[from] tidal_vault::VaultError),

    #[error("store error: {0}")]
    Store(#[from] tidal_store::StoreError),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("{0} is not running")]
    ChainStopped(ChainId),

    #[error("runtime error: {0}")]
    Runtime(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
