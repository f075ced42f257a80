//! Deposit and withdrawal against a ledger and a native reserve.

use crate::error::VaultError;
use crate::reserve::NativeReserve;
use tidal_accrual::AccrualLedger;
use tidal_types::{HolderId, Timestamp, TRANSFER_ALL};
use tracing::{error, info, warn};

/// Vault endpoint for one chain. `operator` must hold `MintBurn` on the ledger.
#[derive(Clone, Debug)]
pub struct Vault {
    operator: HolderId,
}

impl Vault {
    pub fn new(operator: HolderId) -> Self {
        Self { operator }
    }

    pub fn operator(&self) -> &HolderId {
        &self.operator
    }

    /// Lock `amount` of `holder`'s native value and mint it at the current
    /// global rate. A funded holder keeps its locked rate.
    pub fn deposit(
        &self,
        ledger: &mut AccrualLedger,
        reserve: &mut dyn NativeReserve,
        holder: &HolderId,
        amount: u128,
        now: Timestamp,
    ) -> Result<(), VaultError> {
        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }
        reserve.accept(holder, amount)?;
        if let Err(e) = ledger.mint_at_current_rate(&self.operator, holder, amount, now) {
            warn!(chain = %ledger.chain(), holder = %holder, amount, error = %e, "deposit mint failed, refunding");
            if let Err(refund) = reserve.release(holder, amount) {
                error!(holder = %holder, amount, error = %refund, "deposit refund failed");
            }
            return Err(e.into());
        }
        info!(chain = %ledger.chain(), holder = %holder, amount, "deposit");
        Ok(())
    }

    /// Burn `amount` (or everything, with [`TRANSFER_ALL`]) and release the
    /// same native value. Returns the amount released.
    ///
    /// If the reserve cannot pay, the holder's account is put back exactly as
    /// it was and the release error is returned.
    pub fn withdraw(
        &self,
        ledger: &mut AccrualLedger,
        reserve: &mut dyn NativeReserve,
        holder: &HolderId,
        amount: u128,
        now: Timestamp,
    ) -> Result<u128, VaultError> {
        let amount = if amount == TRANSFER_ALL {
            ledger.balance_of(holder, now)?
        } else {
            amount
        };
        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }

        let snapshot = ledger.account(holder).cloned();
        ledger.burn(&self.operator, holder, amount, now)?;
        if let Err(e) = reserve.release(holder, amount) {
            warn!(chain = %ledger.chain(), holder = %holder, amount, error = %e, "release failed, restoring account");
            ledger.restore_account(&self.operator, holder, snapshot)?;
            return Err(e);
        }
        info!(chain = %ledger.chain(), holder = %holder, amount, "withdrawal");
        Ok(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reserve::LocalReserve;
    use tidal_accrual::{LedgerError, Role};
    use tidal_types::{ChainId, Rate, PRECISION};

    fn admin() -> HolderId {
        HolderId::new("tdl_admin")
    }
    fn op() -> HolderId {
        HolderId::new("tdl_vault")
    }
    fn alice() -> HolderId {
        HolderId::new("tdl_alice")
    }
    fn t(secs: u64) -> Timestamp {
        Timestamp::new(secs)
    }

    fn setup(rate: Rate) -> (AccrualLedger, LocalReserve, Vault) {
        let mut ledger = AccrualLedger::new(ChainId::new(1), admin(), rate, t(0));
        ledger.grant_role(&admin(), &op(), Role::MintBurn).unwrap();
        let mut reserve = LocalReserve::new();
        reserve.credit_wallet(&alice(), 1_000).unwrap();
        (ledger, reserve, Vault::new(op()))
    }

    #[test]
    fn deposit_mints_at_current_rate() {
        let rate = Rate::from_raw(PRECISION / 100);
        let (mut ledger, mut reserve, vault) = setup(rate);
        vault.deposit(&mut ledger, &mut reserve, &alice(), 400, t(0)).unwrap();
        assert_eq!(ledger.balance_of(&alice(), t(0)).unwrap(), 400);
        assert_eq!(ledger.locked_rate_of(&alice()), rate);
        assert_eq!(reserve.wallet_of(&alice()), 600);
        assert_eq!(reserve.reserves(), 400);
    }

    #[test]
    fn deposit_without_funds_mints_nothing() {
        let (mut ledger, mut reserve, vault) = setup(Rate::ZERO);
        assert!(matches!(
            vault.deposit(&mut ledger, &mut reserve, &alice(), 1_001, t(0)),
            Err(VaultError::InsufficientFunds { .. })
        ));
        assert!(ledger.account(&alice()).is_none());
    }

    #[test]
    fn failed_mint_refunds_native_value() {
        let mut ledger = AccrualLedger::new(ChainId::new(1), admin(), Rate::ZERO, t(0));
        let mut reserve = LocalReserve::new();
        reserve.credit_wallet(&alice(), 50).unwrap();
        let vault = Vault::new(op());
        let err = vault
            .deposit(&mut ledger, &mut reserve, &alice(), 50, t(0))
            .unwrap_err();
        assert!(matches!(
            err,
            VaultError::Ledger(LedgerError::InsufficientPrivilege { .. })
        ));
        assert_eq!(reserve.wallet_of(&alice()), 50);
        assert_eq!(reserve.reserves(), 0);
    }

    #[test]
    fn withdraw_all_pays_interest_from_rewards() {
        // 1% per second for 10 seconds: 400 -> 440.
        let (mut ledger, mut reserve, vault) = setup(Rate::from_raw(PRECISION / 100));
        reserve.fund_rewards(40).unwrap();
        vault.deposit(&mut ledger, &mut reserve, &alice(), 400, t(0)).unwrap();
        let out = vault
            .withdraw(&mut ledger, &mut reserve, &alice(), TRANSFER_ALL, t(10))
            .unwrap();
        assert_eq!(out, 440);
        assert_eq!(reserve.wallet_of(&alice()), 1_040);
        assert_eq!(reserve.reserves(), 0);
        assert_eq!(ledger.balance_of(&alice(), t(10)).unwrap(), 0);
    }

    #[test]
    fn unfunded_interest_restores_account() {
        let (mut ledger, mut reserve, vault) = setup(Rate::from_raw(PRECISION / 100));
        vault.deposit(&mut ledger, &mut reserve, &alice(), 400, t(0)).unwrap();
        let before = ledger.account(&alice()).cloned();
        assert_eq!(
            vault.withdraw(&mut ledger, &mut reserve, &alice(), TRANSFER_ALL, t(10)),
            Err(VaultError::InsufficientReserves {
                needed: 440,
                available: 400
            })
        );
        assert_eq!(ledger.account(&alice()).cloned(), before);
        assert_eq!(ledger.balance_of(&alice(), t(10)).unwrap(), 440);
        assert_eq!(reserve.reserves(), 400);
    }

    #[test]
    fn withdraw_more_than_balance_fails() {
        let (mut ledger, mut reserve, vault) = setup(Rate::ZERO);
        vault.deposit(&mut ledger, &mut reserve, &alice(), 100, t(0)).unwrap();
        assert!(matches!(
            vault.withdraw(&mut ledger, &mut reserve, &alice(), 101, t(0)),
            Err(VaultError::Ledger(LedgerError::InsufficientBalance { .. }))
        ));
        assert_eq!(
            vault.withdraw(&mut ledger, &mut reserve, &alice(), 0, t(0)),
            Err(VaultError::ZeroAmount)
        );
    }
}
