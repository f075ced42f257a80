use proptest::prelude::*;
use std::sync::{Arc, Mutex};

use tidal_accrual::{AccrualLedger, LedgerEvent, Role};
use tidal_types::{ChainId, HolderId, Rate, Timestamp, PRECISION};

fn admin() -> HolderId {
    HolderId::new("tdl_admin")
}

fn minter() -> HolderId {
    HolderId::new("tdl_minter")
}

fn holder(i: usize) -> HolderId {
    HolderId::new(format!("tdl_holder{i}"))
}

fn make_ledger(rate: u128) -> AccrualLedger {
    let mut ledger = AccrualLedger::new(ChainId::new(1), admin(), Rate::from_raw(rate), Timestamp::new(0));
    ledger.grant_role(&admin(), &minter(), Role::MintBurn).unwrap();
    ledger
}

#[derive(Clone, Debug)]
enum Op {
    Mint { to: usize, amount: u128, rate: u128 },
    Burn { from: usize, amount: u128 },
    Transfer { from: usize, to: usize, amount: u128 },
    Touch { who: usize },
    Advance { secs: u64 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..4, 1u128..1_000_000_000, 0u128..100_000_000_000)
            .prop_map(|(to, amount, rate)| Op::Mint { to, amount, rate }),
        (0usize..4, 0u128..1_000_000_000).prop_map(|(from, amount)| Op::Burn { from, amount }),
        (0usize..4, 0usize..4, 0u128..1_000_000_000)
            .prop_map(|(from, to, amount)| Op::Transfer { from, to, amount }),
        (0usize..4).prop_map(|who| Op::Touch { who }),
        (0u64..100_000).prop_map(|secs| Op::Advance { secs }),
    ]
}

/// Independent evaluation of the growth law, straight from the definition.
fn expected_balance(principal: u128, rate: Rate, last_touch: Timestamp, now: Timestamp) -> u128 {
    let dt = now.as_secs().saturating_sub(last_touch.as_secs()) as u128;
    principal * (PRECISION + rate.raw() * dt) / PRECISION
}

proptest! {
    /// An untouched account's balance is exactly A * (PRECISION + R*Δ) / PRECISION,
    /// however many times it is read.
    #[test]
    fn untouched_balance_is_exact(
        amount in 1u128..1_000_000_000_000,
        rate in 0u128..1_000_000_000_000,
        t0 in 0u64..1_000_000,
        delta in 0u64..10_000_000,
    ) {
        let mut ledger = make_ledger(rate);
        let alice = holder(0);
        ledger.mint(&minter(), &alice, amount, Rate::from_raw(rate), Timestamp::new(t0)).unwrap();

        let now = Timestamp::new(t0 + delta);
        let expected = amount * (PRECISION + rate * delta as u128) / PRECISION;
        for _ in 0..3 {
            prop_assert_eq!(ledger.balance_of(&alice, now).unwrap(), expected);
        }
        prop_assert_eq!(ledger.principal_of(&alice), amount);
    }

    /// Balance never decreases through the passage of time alone.
    #[test]
    fn balance_monotonic_in_time(
        amount in 1u128..1_000_000_000_000,
        rate in 0u128..1_000_000_000_000,
        t1 in 0u64..1_000_000,
        dt in 0u64..1_000_000,
    ) {
        let mut ledger = make_ledger(rate);
        let alice = holder(0);
        ledger.mint_at_current_rate(&minter(), &alice, amount, Timestamp::new(0)).unwrap();
        let b1 = ledger.balance_of(&alice, Timestamp::new(t1)).unwrap();
        let b2 = ledger.balance_of(&alice, Timestamp::new(t1 + dt)).unwrap();
        prop_assert!(b2 >= b1);
    }

    /// Touching twice at the same instant changes nothing the second time.
    #[test]
    fn touch_is_idempotent(
        amount in 1u128..1_000_000_000_000,
        rate in 0u128..1_000_000_000_000,
        at in 0u64..10_000_000,
    ) {
        let mut ledger = make_ledger(rate);
        let alice = holder(0);
        ledger.mint_at_current_rate(&minter(), &alice, amount, Timestamp::new(0)).unwrap();
        ledger.touch(&alice, Timestamp::new(at)).unwrap();
        let once = ledger.account(&alice).cloned();
        prop_assert_eq!(ledger.touch(&alice, Timestamp::new(at)).unwrap(), 0);
        prop_assert_eq!(ledger.account(&alice).cloned(), once);
    }

    /// Conservation: after every operation the materialized principal equals
    /// mints − burns + materialized interest, and the live supply equals the
    /// independently evaluated growth law over every account.
    #[test]
    fn conservation_across_local_operations(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut ledger = make_ledger(50_000_000_000);
        let interest = Arc::new(Mutex::new(0u128));
        let sink = Arc::clone(&interest);
        ledger.events_mut().subscribe(Box::new(move |event| {
            if let LedgerEvent::InterestMinted { amount, .. } = event {
                *sink.lock().unwrap() += amount;
            }
        }));

        let mut now = 0u64;
        let mut minted = 0u128;
        let mut burned = 0u128;

        for op in ops {
            let ts = Timestamp::new(now);
            match op {
                Op::Mint { to, amount, rate } => {
                    ledger.mint(&minter(), &holder(to), amount, Rate::from_raw(rate), ts).unwrap();
                    minted += amount;
                }
                Op::Burn { from, amount } => {
                    if let Ok(done) = ledger.burn(&minter(), &holder(from), amount, ts) {
                        burned += done;
                    }
                }
                Op::Transfer { from, to, amount } => {
                    let _ = ledger.transfer(&holder(from), &holder(to), amount, ts);
                }
                Op::Touch { who } => {
                    ledger.touch(&holder(who), ts).unwrap();
                }
                Op::Advance { secs } => now += secs,
            }

            let ts = Timestamp::new(now);
            let materialized = *interest.lock().unwrap();
            prop_assert_eq!(ledger.total_principal().unwrap(), minted + materialized - burned);

            let independent: u128 = ledger
                .holders()
                .filter_map(|h| ledger.account(h))
                .map(|s| expected_balance(s.principal, s.locked_rate, s.last_touch, ts))
                .sum();
            prop_assert_eq!(ledger.total_supply(ts).unwrap(), independent);
        }
    }

    /// A zero-balance recipient adopts the sender's rate; a funded one keeps its own.
    #[test]
    fn transfer_rate_adoption(
        sender_rate in 1u128..1_000_000_000,
        recipient_rate in 1u128..1_000_000_000,
        funded in any::<bool>(),
        amount in 1u128..1_000_000,
    ) {
        let mut ledger = make_ledger(0);
        let (alice, bob) = (holder(0), holder(1));
        let now = Timestamp::new(10);
        ledger.mint(&minter(), &alice, amount, Rate::from_raw(sender_rate), now).unwrap();
        if funded {
            ledger.mint(&minter(), &bob, 1, Rate::from_raw(recipient_rate), now).unwrap();
        }
        ledger.transfer(&alice, &bob, amount, now).unwrap();

        let expected = if funded { recipient_rate } else { sender_rate };
        prop_assert_eq!(ledger.locked_rate_of(&bob).raw(), expected);
        prop_assert_eq!(ledger.balance_of(&alice, now).unwrap(), 0);
    }
}
