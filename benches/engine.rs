// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
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

//! Benchmarks for the ledger engine.
//!
//! Run with: cargo bench
//!
//! Every mutation rewrites whole documents, so cost grows with the size of
//! the history. Benchmarks include:
//! - Single operations on a small ledger
//! - Sequential throughput as history accumulates
//! - Ranking projection alone
//! - Contention from parallel callers
//! - File-backed writes

use chrono::Utc;
use criterion::{
    BatchSize, BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main,
};
use rayon::prelude::*;
use rust_decimal::Decimal;
use std::sync::Arc;
use token_ledger::ranking;
use token_ledger::{
    CategoryLimits, DocumentStore, FileStore, Ledger, MemoryStore, OnCorrupt, Repository,
    TransactionRequest, User, UserId,
};

// =============================================================================
// Helper Functions
// =============================================================================

fn ledger_over(store: Arc<dyn DocumentStore>) -> Ledger {
    Ledger::new(
        Repository::new(store, OnCorrupt::Fail),
        CategoryLimits::default(),
    )
}

/// In-memory ledger with `users` users named `p0..`, each holding 1000.
fn seeded_ledger(users: usize) -> Ledger {
    let ledger = ledger_over(Arc::new(MemoryStore::new()));
    for i in 0..users {
        ledger
            .create_user(Some(&format!("p{i}")), Some(Decimal::from(1000)))
            .unwrap();
    }
    ledger
}

fn make_add(user: usize, amount: i64) -> TransactionRequest {
    TransactionRequest::add(format!("p{user}"), Decimal::from(amount)).in_category("poker")
}

fn make_subtract(user: usize, amount: i64) -> TransactionRequest {
    TransactionRequest::subtract(format!("p{user}"), Decimal::from(amount)).in_category("poker")
}

// =============================================================================
// Single-Operation Benchmarks
// =============================================================================

fn bench_single_add(c: &mut Criterion) {
    c.bench_function("single_add", |b| {
        b.iter_batched(
            || seeded_ledger(1),
            |ledger| ledger.apply(black_box(&make_add(0, 10))).unwrap(),
            BatchSize::SmallInput,
        )
    });
}

fn bench_single_exchange(c: &mut Criterion) {
    c.bench_function("single_exchange", |b| {
        b.iter_batched(
            || seeded_ledger(1),
            |ledger| {
                let request =
                    TransactionRequest::subtract("p0", Decimal::from(50)).in_category("exchange");
                ledger.apply(black_box(&request)).unwrap()
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_create_user(c: &mut Criterion) {
    c.bench_function("create_user_generated_id", |b| {
        b.iter_batched(
            || seeded_ledger(10),
            |ledger| ledger.create_user(None, Some(Decimal::from(100))).unwrap(),
            BatchSize::SmallInput,
        )
    });
}

// =============================================================================
// Throughput Benchmarks
// =============================================================================

fn bench_sequential_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("sequential_throughput");
    group.sample_size(10);

    for count in [10, 100, 500].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter(|| {
                let ledger = seeded_ledger(10);
                for i in 0..count {
                    let request = if i % 2 == 0 {
                        make_add(i % 10, 20)
                    } else {
                        make_subtract(i % 10, 10)
                    };
                    ledger.apply(&request).unwrap();
                }
                black_box(&ledger);
            })
        });
    }
    group.finish();
}

fn bench_ranking_projection(c: &mut Criterion) {
    let mut group = c.benchmark_group("ranking_projection");
    let now = Utc::now();

    for count in [100, 1_000, 10_000].iter() {
        let users: Vec<User> = (0..*count)
            .map(|i| User::new(UserId::new(format!("p{i}")), (i * 7919 % 1000) as i64, now))
            .collect();

        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &users, |b, users| {
            b.iter(|| ranking::project(black_box(users)))
        });
    }
    group.finish();
}

// =============================================================================
// Contention Benchmarks
// =============================================================================

fn bench_thread_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("thread_scaling");
    group.sample_size(10);
    let total_ops = 200usize;

    for num_threads in [1, 2, 4, 8].iter() {
        group.throughput(Throughput::Elements(total_ops as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(num_threads),
            num_threads,
            |b, &num_threads| {
                // Configure rayon thread pool for this benchmark
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(num_threads)
                    .build()
                    .unwrap();

                b.iter(|| {
                    let ledger = seeded_ledger(20);

                    pool.install(|| {
                        (0..total_ops).into_par_iter().for_each(|i| {
                            ledger.apply(&make_add(i % 20, 5)).unwrap();
                            if i % 4 == 0 {
                                black_box(ledger.ranking().unwrap());
                            }
                        });
                    });

                    black_box(&ledger);
                })
            },
        );
    }
    group.finish();
}

// =============================================================================
// Storage Benchmarks
// =============================================================================

fn bench_file_store_writes(c: &mut Criterion) {
    let mut group = c.benchmark_group("file_store_writes");
    group.sample_size(10);

    for count in [10, 50].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter_batched(
                || {
                    let dir = tempfile::tempdir().unwrap();
                    let ledger = ledger_over(Arc::new(FileStore::open(dir.path()).unwrap()));
                    ledger
                        .create_user(Some("p0"), Some(Decimal::from(1000)))
                        .unwrap();
                    (dir, ledger)
                },
                |(dir, ledger)| {
                    for _ in 0..count {
                        ledger.apply(&make_add(0, 1)).unwrap();
                    }
                    drop(dir);
                },
                BatchSize::PerIteration,
            )
        });
    }
    group.finish();
}

criterion_group!(single, bench_single_add, bench_single_exchange, bench_create_user,);

criterion_group!(throughput, bench_sequential_throughput, bench_ranking_projection,);

criterion_group!(scaling, bench_thread_scaling,);

criterion_group!(storage, bench_file_store_writes,);

criterion_main!(single, throughput, scaling, storage);
