//! Native-asset custody behind the vault.

use crate::error::VaultError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tidal_types::HolderId;

/// Custody of the chain's native asset.
pub trait NativeReserve {
    /// Take `amount` of native value from `from` into the reserve.
    fn accept(&mut self, from: &HolderId, amount: u128) -> Result<(), VaultError>;

    /// Pay `amount` of native value out of the reserve to `to`.
    fn release(&mut self, to: &HolderId, amount: u128) -> Result<(), VaultError>;

    /// Native value currently held by the reserve.
    fn reserves(&self) -> u128;
}

/// In-memory reserve with per-holder native wallets and one pooled balance.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalReserve {
    wallets: HashMap<HolderId, u128>,
    pool: u128,
}

impl LocalReserve {
    pub fn new() -> Self {
        Self::default()
    }

    /// Native value a holder has outside the vault.
    pub fn wallet_of(&self, holder: &HolderId) -> u128 {
        self.wallets.get(holder).copied().unwrap_or(0)
    }

    /// Give a holder native value (genesis allocation, faucet).
    pub fn credit_wallet(&mut self, holder: &HolderId, amount: u128) -> Result<(), VaultError> {
        let wallet = self.wallets.entry(holder.clone()).or_insert(0);
        *wallet = wallet.checked_add(amount).ok_or(VaultError::Overflow)?;
        Ok(())
    }

    /// Add native value to the pool so accrued interest can be paid out.
    pub fn fund_rewards(&mut self, amount: u128) -> Result<(), VaultError> {
        self.pool = self.pool.checked_add(amount).ok_or(VaultError::Overflow)?;
        tracing::info!(amount, pool = self.pool, "reward pool funded");
        Ok(())
    }
}

impl NativeReserve for LocalReserve {
    fn accept(&mut self, from: &HolderId, amount: u128) -> Result<(), VaultError> {
        let available = self.wallet_of(from);
        if amount > available {
            return Err(VaultError::InsufficientFunds {
                holder: from.clone(),
                needed: amount,
                available,
            });
        }
        let pool = self.pool.checked_add(amount).ok_or(VaultError::Overflow)?;
        self.wallets.insert(from.clone(), available - amount);
        self.pool = pool;
        Ok(())
    }

    fn release(&mut self, to: &HolderId, amount: u128) -> Result<(), VaultError> {
        if amount > self.pool {
            return Err(VaultError::InsufficientReserves {
                needed: amount,
                available: self.pool,
            });
        }
        let wallet = self
            .wallet_of(to)
            .checked_add(amount)
            .ok_or(VaultError::Overflow)?;
        self.pool -= amount;
        self.wallets.insert(to.clone(), wallet);
        Ok(())
    }

    fn reserves(&self) -> u128 {
        self.pool
    }
}
