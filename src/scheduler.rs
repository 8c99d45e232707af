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

//! The drain loop.
//!
//! A [`Scheduler`] owns a [`TransactionQueue`] and runs drain cycles on
//! demand. Each cycle:
//!
//! 1. refills the queue from the [`TransactionSource`] if it is empty,
//! 2. pops transactions earliest scheduled date first and hands each one to
//!    the [`TransactionProcessor`] exactly once,
//! 3. reports the resulting status back to the source,
//!
//! and ends only once the queue is empty.
//!
//! # Re-entrancy
//!
//! At most one cycle runs at a time. The scheduler is IDLE or DRAINING; the
//! switch is an atomic compare-and-swap, so a trigger that arrives while a
//! cycle is running is dropped with [`CycleError::AlreadyDraining`] and never
//! queued behind it.

use crate::error::CycleError;
use crate::processor::{ProcessingOutcome, TransactionProcessor};
use crate::source::TransactionSource;
use crate::transaction::Transaction;
use crate::transaction_queue::TransactionQueue;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// What happened during one drain cycle, in drain order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Each drained transaction, carrying its new status, with its outcome.
    pub outcomes: Vec<(Transaction, ProcessingOutcome)>,
}

impl CycleReport {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn processed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| outcome.is_processed())
            .count()
    }

    pub fn failed(&self) -> usize {
        self.len() - self.processed()
    }
}

/// Marks the scheduler DRAINING for as long as it lives.
///
/// Dropping it, including during unwinding, returns the scheduler to IDLE.
struct DrainGuard<'a> {
    draining: &'a AtomicBool,
}

impl<'a> DrainGuard<'a> {
    fn acquire(draining: &'a AtomicBool) -> Option<Self> {
        draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { draining })
    }
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.draining.store(false, Ordering::Release);
    }
}

/// Periodic driver that drains pending transactions in date order.
pub struct Scheduler {
    queue: Mutex<TransactionQueue>,
    draining: AtomicBool,
    source: Arc<dyn TransactionSource>,
    processor: TransactionProcessor,
}

impl Scheduler {
    pub fn new(source: Arc<dyn TransactionSource>, processor: TransactionProcessor) -> Self {
        Self {
            queue: Mutex::new(TransactionQueue::new()),
            draining: AtomicBool::new(false),
            source,
            processor,
        }
    }

    /// True while a drain cycle is running.
    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    /// Number of transactions still waiting in the queue.
    pub fn queued(&self) -> usize {
        self.queue.lock().len()
    }

    /// Runs one drain cycle.
    ///
    /// Blocks while the source is queried and while the ledger applies each
    /// update. Per-transaction failures are recorded in the report and never
    /// stop the cycle.
    ///
    /// # Errors
    ///
    /// - [`CycleError::AlreadyDraining`] - another cycle is running; nothing was done.
    /// - [`CycleError::SourceUnavailable`] - the queue was empty and refilling it
    ///   failed; nothing was drained.
    pub fn process_queue(&self) -> Result<CycleReport, CycleError> {
        let Some(_guard) = DrainGuard::acquire(&self.draining) else {
            tracing::debug!("drain cycle already running, trigger dropped");
            return Err(CycleError::AlreadyDraining);
        };

        if !self.refill()? {
            tracing::trace!("no unprocessed transactions");
            return Ok(CycleReport::default());
        }

        let mut report = CycleReport::default();
        while let Some(mut transaction) = self.pop_next() {
            if !transaction.is_waiting() {
                tracing::warn!(
                    id = ?transaction.id,
                    status = ?transaction.status,
                    "skipping transaction that is not waiting"
                );
                continue;
            }

            let outcome = self.processor.process(&transaction);
            transaction.status = outcome.status();

            if let Err(e) = self.source.record_outcome(&transaction) {
                tracing::warn!(
                    id = ?transaction.id,
                    "failed to record transaction status: {}",
                    e
                );
            }

            report.outcomes.push((transaction, outcome));
        }

        tracing::info!(
            drained = report.len(),
            processed = report.processed(),
            failed = report.failed(),
            "drain cycle completed"
        );
        Ok(report)
    }

    /// Fills an empty queue from the source. Returns whether there is work.
    fn refill(&self) -> Result<bool, CycleError> {
        if !self.queue.lock().is_empty() {
            return Ok(true);
        }

        let batch = self.source.fetch_unprocessed().inspect_err(|e| {
            tracing::warn!("refill failed, cycle skipped: {}", e);
        })?;
        if batch.is_empty() {
            return Ok(false);
        }

        tracing::info!(count = batch.len(), "queue refilled");
        self.queue.lock().refill(batch);
        Ok(true)
    }

    fn pop_next(&self) -> Option<Transaction> {
        self.queue.lock().pop_min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::OverdraftPolicy;
    use crate::base::{AccountId, TransactionId};
    use crate::error::SourceError;
    use crate::ledger::InMemoryLedger;
    use crate::money::Money;
    use crate::transaction::TransactionType;
    use chrono::{DateTime, Utc};
    use rust_decimal_macros::dec;
    use std::sync::atomic::AtomicUsize;

    /// Source that hands out a fixed batch on every fetch and counts calls.
    struct CountingSource {
        batch: Vec<Transaction>,
        fetches: AtomicUsize,
    }

    impl TransactionSource for CountingSource {
        fn fetch_unprocessed(&self) -> Result<Vec<Transaction>, SourceError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.batch.clone())
        }

        fn record_outcome(&self, _: &Transaction) -> Result<(), SourceError> {
            Ok(())
        }
    }

    fn credit(id: u64, date: DateTime<Utc>) -> Transaction {
        Transaction::new(AccountId(1), dec!(1), TransactionType::Credit, date, "credit")
            .with_id(TransactionId(id))
    }

    fn scheduler(batch: Vec<Transaction>) -> (Arc<CountingSource>, Scheduler) {
        let ledger = Arc::new(InMemoryLedger::new(OverdraftPolicy::Reject));
        ledger.open_account(AccountId(1), Money::ZERO);
        let source = Arc::new(CountingSource {
            batch,
            fetches: AtomicUsize::new(0),
        });
        let scheduler = Scheduler::new(source.clone(), TransactionProcessor::new(ledger));
        (source, scheduler)
    }

    #[test]
    fn leftover_queue_is_drained_without_refill() {
        let now = Utc::now();
        let (source, scheduler) = scheduler(vec![credit(100, now)]);
        scheduler
            .queue
            .lock()
            .refill((1..=5).map(|id| credit(id, now)).collect::<Vec<_>>());

        let report = scheduler.process_queue().unwrap();

        assert_eq!(report.len(), 5);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.queued(), 0);
    }

    #[test]
    fn trigger_while_draining_is_dropped() {
        let (source, scheduler) = scheduler(vec![credit(1, Utc::now())]);
        let _held = DrainGuard::acquire(&scheduler.draining).unwrap();

        assert!(scheduler.is_draining());
        assert_eq!(scheduler.process_queue(), Err(CycleError::AlreadyDraining));
        assert_eq!(source.fetches.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn guard_is_released_after_cycle() {
        let (_, scheduler) = scheduler(vec![credit(1, Utc::now())]);
        scheduler.process_queue().unwrap();
        assert!(!scheduler.is_draining());
        assert!(DrainGuard::acquire(&scheduler.draining).is_some());
    }

    #[test]
    fn non_waiting_transactions_are_skipped() {
        let now = Utc::now();
        let done = credit(2, now).with_status(crate::transaction::TransactionStatus::Processed);
        let (_, scheduler) = scheduler(vec![credit(1, now), done]);

        let report = scheduler.process_queue().unwrap();

        assert_eq!(report.len(), 1);
        assert_eq!(report.outcomes[0].0.id, Some(TransactionId(1)));
    }
}
