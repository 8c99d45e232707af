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

//! Date-ordered transaction queue.
//!
//! Holds one refill batch at a time and hands transactions out earliest
//! scheduled date first. Transactions sharing a date leave in the order they
//! arrived in the batch.

use crate::transaction::Transaction;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Heap entry ordered so that the max-heap yields the earliest date first.
#[derive(Debug)]
struct QueuedTransaction {
    date: Option<DateTime<Utc>>,
    sequence: u64,
    transaction: Transaction,
}

impl QueuedTransaction {
    fn key(&self) -> (Option<DateTime<Utc>>, u64) {
        (self.date, self.sequence)
    }
}

impl PartialEq for QueuedTransaction {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for QueuedTransaction {}

impl PartialOrd for QueuedTransaction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedTransaction {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: smaller (date, sequence) has higher priority.
        // An absent date sorts before every real date.
        other.key().cmp(&self.key())
    }
}

/// Min-priority queue of transactions keyed by scheduled date.
///
/// Owned by a single [`Scheduler`](crate::Scheduler); it is refilled only
/// once it has been fully drained.
#[derive(Debug, Default)]
pub struct TransactionQueue {
    entries: BinaryHeap<QueuedTransaction>,
}

impl TransactionQueue {
    /// Creates a new empty transaction queue.
    pub fn new() -> Self {
        Self {
            entries: BinaryHeap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Replaces the queue contents with `batch`.
    ///
    /// Arrival order within the batch breaks ties between equal dates.
    /// Callers refill only an empty queue.
    pub fn refill<I>(&mut self, batch: I)
    where
        I: IntoIterator<Item = Transaction>,
    {
        debug_assert!(self.is_empty(), "refill called on a non-empty queue");
        self.entries = batch
            .into_iter()
            .zip(0u64..)
            .map(|(transaction, sequence)| QueuedTransaction {
                date: transaction.date,
                sequence,
                transaction,
            })
            .collect();
    }

    /// Returns the next transaction to drain without removing it.
    pub fn peek_min(&self) -> Option<&Transaction> {
        self.entries.peek().map(|entry| &entry.transaction)
    }

    /// Removes and returns the transaction [`peek_min`](Self::peek_min) would return.
    pub fn pop_min(&mut self) -> Option<Transaction> {
        self.entries.pop().map(|entry| entry.transaction)
    }
}
