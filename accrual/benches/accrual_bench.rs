use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use tidal_accrual::{AccountState, AccrualLedger, Role};
use tidal_types::{ChainId, HolderId, Rate, Timestamp, PRECISION};

fn make_ledger(holders: usize) -> AccrualLedger {
    let admin = HolderId::new("tdl_admin");
    let minter = HolderId::new("tdl_minter");
    let mut ledger = AccrualLedger::new(
        ChainId::new(1),
        admin.clone(),
        Rate::from_raw(PRECISION / 1_000_000),
        Timestamp::new(0),
    );
    ledger.grant_role(&admin, &minter, Role::MintBurn).unwrap();
    for i in 0..holders {
        let holder = HolderId::new(format!("tdl_h{i}"));
        ledger
            .mint_at_current_rate(&minter, &holder, 1_000_000 + i as u128, Timestamp::new(i as u64))
            .unwrap();
    }
    ledger
}

fn bench_balance_read(c: &mut Criterion) {
    let state = AccountState::new(1_000_000_000, Rate::from_raw(PRECISION / 1_000_000), Timestamp::new(0));
    c.bench_function("account_balance_checked", |b| {
        b.iter(|| black_box(state.balance_checked(black_box(Timestamp::new(31_536_000)))));
    });
}

fn bench_total_supply(c: &mut Criterion) {
    let mut group = c.benchmark_group("total_supply");
    for holders in [10, 100, 1000, 10_000] {
        let ledger = make_ledger(holders);
        group.bench_with_input(BenchmarkId::new("holders", holders), &holders, |b, _| {
            b.iter(|| black_box(ledger.total_supply(black_box(Timestamp::new(1_000_000)))));
        });
    }
    group.finish();
}

fn bench_transfer(c: &mut Criterion) {
    let alice = HolderId::new("tdl_h0");
    let bob = HolderId::new("tdl_h1");
    c.bench_function("ledger_transfer", |b| {
        b.iter_batched(
            || make_ledger(2),
            |mut ledger| {
                let _ = black_box(ledger.transfer(&alice, &bob, 100, Timestamp::new(10_000)));
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_balance_read, bench_total_supply, bench_transfer);
criterion_main!(benches);
