// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Tipvault Authors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Benchmarks for the wallet engine.
//!
//! Run with: cargo bench
//!
//! Benchmarks include:
//! - Single-threaded wallet mutations
//! - Multi-threaded concurrent wallet mutations
//! - Access resolution (trial, ownership, ledger purchase)
//! - Scaling with number of accounts

use chrono::{DateTime, Duration, TimeZone, Utc};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rayon::prelude::*;
use rust_decimal::Decimal;
use std::sync::Arc;
use tipvault::{
    AccountId, CatalogItem, Category, Engine, ItemId, NewTransaction, PaymentMethod,
    TransactionKind,
};

// =============================================================================
// Helper Functions
// =============================================================================

fn registration_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

fn purchase_time() -> DateTime<Utc> {
    registration_time() + Duration::days(10)
}

fn make_credit(amount: i64) -> NewTransaction {
    NewTransaction::new(TransactionKind::Credit, Decimal::new(amount, 4), "top-up")
}

fn make_debit(amount: i64) -> NewTransaction {
    NewTransaction::new(TransactionKind::Debit, Decimal::new(amount, 4), "adjustment")
}

fn make_item(id: u64, price: i64) -> CatalogItem {
    CatalogItem {
        id: ItemId(id),
        price: Decimal::new(price, 4),
        category: Category::from("mega"),
        is_active: true,
    }
}

fn engine_with_accounts(count: u64) -> Engine {
    let engine = Engine::new();
    for id in 1..=count {
        engine
            .register_account(AccountId(id), Category::from("powerball"), registration_time())
            .unwrap();
    }
    engine
}

// =============================================================================
// Single-Threaded Benchmarks
// =============================================================================

fn bench_single_credit(c: &mut Criterion) {
    c.bench_function("single_credit", |b| {
        b.iter(|| {
            let engine = engine_with_accounts(1);
            engine
                .apply_transaction(AccountId(1), black_box(make_credit(10000)), purchase_time())
                .unwrap();
        })
    });
}

fn bench_single_purchase(c: &mut Criterion) {
    c.bench_function("single_purchase", |b| {
        b.iter(|| {
            let engine = engine_with_accounts(1);
            engine
                .apply_transaction(AccountId(1), make_credit(10000), purchase_time())
                .unwrap();
            engine
                .request_access(
                    AccountId(1),
                    black_box(&make_item(42, 5000)),
                    Some(PaymentMethod::Ledger),
                    purchase_time(),
                )
                .unwrap();
        })
    });
}

fn bench_credit_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("credit_throughput");

    for count in [100, 1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter(|| {
                let engine = engine_with_accounts(1);
                for _ in 0..count {
                    engine
                        .apply_transaction(AccountId(1), make_credit(10000), purchase_time())
                        .unwrap();
                }
                black_box(&engine);
            })
        });
    }
    group.finish();
}

fn bench_mixed_transactions(c: &mut Criterion) {
    let mut group = c.benchmark_group("mixed_transactions");

    for count in [100, 1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter(|| {
                let engine = engine_with_accounts(1);

                for _ in 0..count {
                    engine
                        .apply_transaction(AccountId(1), make_credit(10000), purchase_time())
                        .unwrap();
                    let _ = engine.apply_transaction(
                        AccountId(1),
                        make_debit(5000),
                        purchase_time(),
                    );
                }
                black_box(&engine);
            })
        });
    }
    group.finish();
}

// =============================================================================
// Access Resolution Benchmarks
// =============================================================================

fn bench_access_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("access_resolution");

    // Trial view during the free window: no wallet movement.
    group.bench_function("trial_view", |b| {
        b.iter(|| {
            let engine = engine_with_accounts(1);
            let item = CatalogItem {
                id: ItemId(1),
                price: Decimal::new(5000, 4),
                category: Category::from("powerball"),
                is_active: true,
            };
            engine
                .request_access(AccountId(1), black_box(&item), None, registration_time())
                .unwrap();
        })
    });

    // Repeat access to an owned item: the hot idempotent path.
    group.bench_function("owned_view", |b| {
        let engine = engine_with_accounts(1);
        engine
            .apply_transaction(AccountId(1), make_credit(100_000), purchase_time())
            .unwrap();
        engine
            .request_access(
                AccountId(1),
                &make_item(42, 5000),
                Some(PaymentMethod::Ledger),
                purchase_time(),
            )
            .unwrap();

        b.iter(|| {
            engine
                .request_access(AccountId(1), black_box(&make_item(42, 5000)), None, purchase_time())
                .unwrap();
        })
    });

    // Full ledger purchase: debit plus record insert.
    group.bench_function("ledger_purchase", |b| {
        b.iter(|| {
            let engine = engine_with_accounts(1);
            engine
                .apply_transaction(AccountId(1), make_credit(10000), purchase_time())
                .unwrap();
            engine
                .request_access(
                    AccountId(1),
                    black_box(&make_item(42, 5000)),
                    Some(PaymentMethod::Ledger),
                    purchase_time(),
                )
                .unwrap();
        })
    });

    group.finish();
}

// =============================================================================
// Multi-Account Benchmarks
// =============================================================================

fn bench_multi_account_sequential(c: &mut Criterion) {
    let mut group = c.benchmark_group("multi_account_sequential");

    for num_accounts in [10u64, 100, 1_000].iter() {
        let tx_per_account = 100;
        let total_tx = *num_accounts * tx_per_account;

        group.throughput(Throughput::Elements(total_tx));
        group.bench_with_input(
            BenchmarkId::from_parameter(num_accounts),
            num_accounts,
            |b, &num_accounts| {
                b.iter(|| {
                    let engine = engine_with_accounts(num_accounts);

                    for account in 1..=num_accounts {
                        for _ in 0..tx_per_account {
                            engine
                                .apply_transaction(
                                    AccountId(account),
                                    make_credit(10000),
                                    purchase_time(),
                                )
                                .unwrap();
                        }
                    }
                    black_box(&engine);
                })
            },
        );
    }
    group.finish();
}

// =============================================================================
// Multi-Threaded Benchmarks
// =============================================================================

fn bench_parallel_credits_same_account(c: &mut Criterion) {
    let mut group = c.benchmark_group("parallel_credits_same_account");

    for count in [1_000, 10_000, 100_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter(|| {
                let engine = Arc::new(engine_with_accounts(1));

                (0..count).into_par_iter().for_each(|_| {
                    let _ = engine.apply_transaction(
                        AccountId(1),
                        make_credit(10000),
                        purchase_time(),
                    );
                });

                black_box(&engine);
            })
        });
    }
    group.finish();
}

fn bench_parallel_credits_different_accounts(c: &mut Criterion) {
    let mut group = c.benchmark_group("parallel_credits_different_accounts");

    const NUM_ACCOUNTS: u64 = 1_000;

    for count in [1_000, 10_000, 100_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter(|| {
                let engine = Arc::new(engine_with_accounts(NUM_ACCOUNTS));

                (0..count).into_par_iter().for_each(|i| {
                    // Each iteration uses a different account (wrapping)
                    let account_id = AccountId((i as u64 % NUM_ACCOUNTS) + 1);
                    engine
                        .apply_transaction(account_id, make_credit(10000), purchase_time())
                        .unwrap();
                });

                black_box(&engine);
            })
        });
    }
    group.finish();
}

fn bench_parallel_mixed_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("parallel_mixed_operations");

    for num_accounts in [10u64, 100, 1_000].iter() {
        let ops_per_account = 100;
        let total_ops = *num_accounts * ops_per_account * 2; // credit + debit

        group.throughput(Throughput::Elements(total_ops));
        group.bench_with_input(
            BenchmarkId::from_parameter(num_accounts),
            num_accounts,
            |b, &num_accounts| {
                b.iter(|| {
                    let engine = Arc::new(engine_with_accounts(num_accounts));

                    // Phase 1: Parallel credits for all accounts
                    (1..=num_accounts).into_par_iter().for_each(|account| {
                        for _ in 0..ops_per_account {
                            engine
                                .apply_transaction(
                                    AccountId(account),
                                    make_credit(10000),
                                    purchase_time(),
                                )
                                .unwrap();
                        }
                    });

                    // Phase 2: Parallel debits for all accounts
                    (1..=num_accounts).into_par_iter().for_each(|account| {
                        for _ in 0..ops_per_account {
                            let _ = engine.apply_transaction(
                                AccountId(account),
                                make_debit(5000),
                                purchase_time(),
                            );
                        }
                    });

                    black_box(&engine);
                })
            },
        );
    }
    group.finish();
}

criterion_group!(
    single_threaded,
    bench_single_credit,
    bench_single_purchase,
    bench_credit_throughput,
    bench_mixed_transactions,
    bench_access_resolution,
    bench_multi_account_sequential,
);

criterion_group!(
    multi_threaded,
    bench_parallel_credits_same_account,
    bench_parallel_credits_different_accounts,
    bench_parallel_mixed_operations,
);

criterion_main!(single_threaded, multi_threaded);
