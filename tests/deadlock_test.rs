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

//! Deadlock detection tests using parking_lot's built-in deadlock detector.
//!
//! These tests drive the in-memory ledger from many threads at once and
//! verify that its locking (a sharded `DashMap` plus a mutex per account)
//! neither deadlocks nor loses updates.

use chrono::Utc;
use ledger_scheduler_rs::{
    AccountId, AccountLedger, InMemoryLedger, InMemoryTransactionStore, LedgerRejection, Money,
    OverdraftPolicy, Scheduler, Transaction, TransactionProcessor, TransactionType,
};
use parking_lot::deadlock;
use rayon::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

// === Deadlock Detection Infrastructure ===

/// Starts a background thread that checks for deadlocks.
/// Returns a handle to stop the detector.
fn start_deadlock_detector() -> Arc<AtomicBool> {
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();

    thread::spawn(move || {
        while running_clone.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(100));
            let deadlocks = deadlock::check_deadlock();
            if !deadlocks.is_empty() {
                eprintln!("\n=== DEADLOCK DETECTED ===");
                for (i, threads) in deadlocks.iter().enumerate() {
                    eprintln!("\nDeadlock #{}", i + 1);
                    for t in threads {
                        eprintln!("Thread ID: {:?}", t.thread_id());
                        eprintln!("Backtrace:\n{:#?}", t.backtrace());
                    }
                }
                panic!("Deadlock detected! See output above for details.");
            }
        }
    });

    running
}

/// Stops the deadlock detector.
fn stop_deadlock_detector(running: Arc<AtomicBool>) {
    running.store(false, Ordering::SeqCst);
    thread::sleep(Duration::from_millis(150));
}

fn ledger_with_accounts(policy: OverdraftPolicy, count: u64, opening: Decimal) -> InMemoryLedger {
    let ledger = InMemoryLedger::new(policy);
    for id in 0..count {
        ledger.open_account(AccountId(id), Money::new(opening));
    }
    ledger
}

// === Tests ===

/// Many threads applying deltas to one account never lose an update.
#[test]
fn no_lost_updates_high_contention_single_account() {
    let detector = start_deadlock_detector();
    let ledger = Arc::new(ledger_with_accounts(OverdraftPolicy::Allow, 1, dec!(0)));

    const NUM_THREADS: usize = 50;
    const OPS_PER_THREAD: usize = 100;

    let mut handles = Vec::with_capacity(NUM_THREADS);
    for _ in 0..NUM_THREADS {
        let ledger = ledger.clone();
        handles.push(thread::spawn(move || {
            for i in 0..OPS_PER_THREAD {
                match i % 3 {
                    0 => {
                        ledger
                            .apply_delta(AccountId(0), Money::new(dec!(10.00)))
                            .unwrap();
                    }
                    1 => {
                        ledger
                            .apply_delta(AccountId(0), Money::new(dec!(-1.00)))
                            .unwrap();
                    }
                    _ => {
                        let _ = ledger.balance(AccountId(0));
                    }
                }
            }
        }));
    }

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    stop_deadlock_detector(detector);

    // 34 credits of 10 and 33 debits of 1 per thread.
    let expected = Decimal::from(NUM_THREADS as u64) * (dec!(340) - dec!(33));
    assert_eq!(ledger.balance(AccountId(0)), Some(Money::new(expected)));
}

/// Rejected overdrafts under contention leave the balance exactly at zero or above.
#[test]
fn no_overdraft_under_contention() {
    let detector = start_deadlock_detector();
    let ledger = Arc::new(ledger_with_accounts(OverdraftPolicy::Reject, 1, dec!(100)));
    let accepted = Arc::new(AtomicUsize::new(0));

    (0..1_000).into_par_iter().for_each(|_| {
        match ledger.apply_delta(AccountId(0), Money::new(dec!(-1))) {
            Ok(_) => {
                accepted.fetch_add(1, Ordering::SeqCst);
            }
            Err(rejection) => {
                assert_eq!(rejection, LedgerRejection::InsufficientFunds(AccountId(0)));
            }
        }
    });

    stop_deadlock_detector(detector);

    assert_eq!(accepted.load(Ordering::SeqCst), 100);
    assert_eq!(ledger.balance(AccountId(0)), Some(Money::ZERO));
}

/// Parallel deltas across many accounts land on the right account.
#[test]
fn no_deadlock_cross_account_operations() {
    let detector = start_deadlock_detector();

    const NUM_ACCOUNTS: u64 = 64;
    const OPS: u64 = 20_000;
    let ledger = Arc::new(ledger_with_accounts(OverdraftPolicy::Allow, NUM_ACCOUNTS, dec!(0)));

    (0..OPS).into_par_iter().for_each(|i| {
        ledger
            .apply_delta(AccountId(i % NUM_ACCOUNTS), Money::new(dec!(1)))
            .unwrap();
    });

    stop_deadlock_detector(detector);

    for id in 0..NUM_ACCOUNTS {
        assert_eq!(
            ledger.balance(AccountId(id)),
            Some(Money::new(Decimal::from(OPS / NUM_ACCOUNTS)))
        );
    }
}

/// Iterating accounts while other threads mutate them does not deadlock.
#[test]
fn no_deadlock_iteration_during_mutation() {
    let detector = start_deadlock_detector();
    let ledger = Arc::new(ledger_with_accounts(OverdraftPolicy::Allow, 16, dec!(0)));
    let stop = Arc::new(AtomicBool::new(false));

    let writers: Vec<_> = (0..4)
        .map(|w| {
            let ledger = ledger.clone();
            thread::spawn(move || {
                for i in 0..2_000u64 {
                    ledger
                        .apply_delta(AccountId((i + w) % 16), Money::new(dec!(0.5)))
                        .unwrap();
                }
            })
        })
        .collect();

    let reader = {
        let ledger = ledger.clone();
        let stop = stop.clone();
        thread::spawn(move || {
            let mut passes = 0usize;
            while !stop.load(Ordering::SeqCst) {
                let total: usize = ledger
                    .accounts()
                    .map(|entry| usize::from(!entry.value().balance().is_absent()))
                    .sum();
                assert_eq!(total, 16);
                passes += 1;
            }
            passes
        })
    };

    for writer in writers {
        writer.join().expect("Writer panicked");
    }
    stop.store(true, Ordering::SeqCst);
    reader.join().expect("Reader panicked");

    stop_deadlock_detector(detector);

    let sum = ledger
        .accounts()
        .try_fold(Money::ZERO, |acc, entry| acc.checked_add(entry.value().balance()))
        .unwrap();
    assert_eq!(sum, Money::new(dec!(4000)));
}

/// Several schedulers draining separate stores into one shared ledger.
#[test]
fn no_deadlock_parallel_schedulers_sharing_a_ledger() {
    let detector = start_deadlock_detector();

    const SCHEDULERS: usize = 8;
    const PER_STORE: usize = 250;
    let ledger = Arc::new(ledger_with_accounts(OverdraftPolicy::Reject, 4, dec!(0)));

    let schedulers: Vec<Scheduler> = (0..SCHEDULERS)
        .map(|_| {
            let store = Arc::new(InMemoryTransactionStore::new());
            for i in 0..PER_STORE {
                store
                    .insert(Transaction::new(
                        AccountId((i % 4) as u64),
                        dec!(2),
                        TransactionType::Credit,
                        Utc::now(),
                        "Deposit",
                    ))
                    .unwrap();
            }
            Scheduler::new(store, TransactionProcessor::new(ledger.clone()))
        })
        .collect();

    let processed: usize = schedulers
        .par_iter()
        .map(|scheduler| scheduler.process_queue().unwrap().processed())
        .sum();

    stop_deadlock_detector(detector);

    assert_eq!(processed, SCHEDULERS * PER_STORE);
    for id in 0..4 {
        let per_account = (SCHEDULERS * PER_STORE / 4) as u64 * 2;
        assert_eq!(
            ledger.balance(AccountId(id)),
            Some(Money::new(Decimal::from(per_account)))
        );
    }
}

/// One scheduler hammered by concurrent triggers still applies each
/// transaction exactly once.
#[test]
fn concurrent_triggers_apply_each_transaction_once() {
    let detector = start_deadlock_detector();
    let ledger = Arc::new(ledger_with_accounts(OverdraftPolicy::Reject, 1, dec!(0)));
    let store = Arc::new(InMemoryTransactionStore::new());
    for _ in 0..500 {
        store
            .insert(Transaction::new(
                AccountId(0),
                dec!(1),
                TransactionType::Credit,
                Utc::now(),
                "Deposit",
            ))
            .unwrap();
    }
    let scheduler = Scheduler::new(store, TransactionProcessor::new(ledger.clone()));

    let processed: usize = (0..64)
        .into_par_iter()
        .filter_map(|_| scheduler.process_queue().ok())
        .map(|report| report.processed())
        .sum();

    stop_deadlock_detector(detector);

    assert_eq!(processed, 500);
    assert_eq!(ledger.balance(AccountId(0)), Some(Money::new(dec!(500))));
    assert!(!scheduler.is_draining());
}
