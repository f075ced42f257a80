//! Property tests for the vault.

use proptest::prelude::*;
use tidal_accrual::{AccrualLedger, Role};
use tidal_types::{ChainId, HolderId, Rate, Timestamp, TRANSFER_ALL};
use tidal_vault::{LocalReserve, NativeReserve, Vault};

proptest! {
    /// Native value plus ledger value is conserved at zero interest.
    #[test]
    fn zero_rate_round_trip_conserves_native_value(
        wallet in 1u128..1_000_000_000u128,
        deposits in proptest::collection::vec(1u128..1_000u128, 1..8),
    ) {
        let admin = HolderId::new("tdl_admin");
        let op = HolderId::new("tdl_vault");
        let holder = HolderId::new("tdl_h");
        let now = Timestamp::new(0);
        let mut ledger = AccrualLedger::new(ChainId::new(1), admin.clone(), Rate::ZERO, now);
        ledger.grant_role(&admin, &op, Role::MintBurn).unwrap();
        let mut reserve = LocalReserve::new();
        reserve.credit_wallet(&holder, wallet).unwrap();
        let vault = Vault::new(op);

        for amount in deposits {
            let _ = vault.deposit(&mut ledger, &mut reserve, &holder, amount, now);
            prop_assert_eq!(
                reserve.wallet_of(&holder) + ledger.balance_of(&holder, now).unwrap(),
                wallet
            );
            prop_assert_eq!(reserve.reserves(), ledger.total_supply(now).unwrap());
        }
        if ledger.balance_of(&holder, now).unwrap() > 0 {
            vault.withdraw(&mut ledger, &mut reserve, &holder, TRANSFER_ALL, now).unwrap();
        }
        prop_assert_eq!(reserve.wallet_of(&holder), wallet);
        prop_assert_eq!(reserve.reserves(), 0);
    }
}
