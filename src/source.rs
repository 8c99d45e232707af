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

//! Transaction storage contract and its in-memory implementation.

use crate::base::TransactionId;
use crate::error::SourceError;
use crate::transaction::{Transaction, TransactionStatus};
use parking_lot::Mutex;
use std::collections::BTreeMap;

/// Supplier of unprocessed transactions, consulted whenever the scheduler's
/// queue runs empty.
pub trait TransactionSource: Send + Sync {
    /// Returns every `WAITING` transaction. May be empty.
    ///
    /// # Errors
    ///
    /// [`SourceError::Unavailable`] when storage cannot be reached.
    fn fetch_unprocessed(&self) -> Result<Vec<Transaction>, SourceError>;

    /// Persists the terminal status of a drained transaction so later fetches
    /// no longer return it.
    ///
    /// # Errors
    ///
    /// [`SourceError`] if the update could not be stored.
    fn record_outcome(&self, transaction: &Transaction) -> Result<(), SourceError>;
}

#[derive(Debug, Default)]
struct StoreData {
    next_id: u64,
    transactions: BTreeMap<TransactionId, Transaction>,
}

/// Transaction storage kept in memory, ordered by id.
#[derive(Debug, Default)]
pub struct InMemoryTransactionStore {
    inner: Mutex<StoreData>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a transaction, assigning the next free id if it has none, and
    /// returns its id. A transaction with an existing id replaces the stored one.
    ///
    /// # Errors
    ///
    /// [`SourceError::IdSpaceExhausted`] if the transaction has no id and the
    /// highest id already stored is `u64::MAX`. Nothing is stored.
    pub fn insert(&self, mut transaction: Transaction) -> Result<TransactionId, SourceError> {
        let mut data = self.inner.lock();
        let id = match transaction.id {
            Some(id) => id,
            None => data
                .next_id
                .checked_add(1)
                .map(TransactionId)
                .ok_or(SourceError::IdSpaceExhausted)?,
        };
        data.next_id = data.next_id.max(id.0);
        transaction.id = Some(id);
        data.transactions.insert(id, transaction);
        Ok(id)
    }

    pub fn get(&self, id: TransactionId) -> Option<Transaction> {
        self.inner.lock().transactions.get(&id).cloned()
    }

    /// Puts an `ERROR` transaction back to `WAITING` so a later refill picks it
    /// up again. Returns `false` if the transaction is unknown or not in error.
    pub fn requeue(&self, id: TransactionId) -> bool {
        let mut data = self.inner.lock();
        match data.transactions.get_mut(&id) {
            Some(transaction) if transaction.status == TransactionStatus::Error => {
                transaction.status = TransactionStatus::Waiting;
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().transactions.is_empty()
    }
}

impl TransactionSource for InMemoryTransactionStore {
    fn fetch_unprocessed(&self) -> Result<Vec<Transaction>, SourceError> {
        Ok(self
            .inner
            .lock()
            .transactions
            .values()
            .filter(|transaction| transaction.is_waiting())
            .cloned()
            .collect())
    }

    fn record_outcome(&self, transaction: &Transaction) -> Result<(), SourceError> {
        let id = transaction.id.ok_or(SourceError::NotFound)?;
        let mut data = self.inner.lock();
        let stored = data
            .transactions
            .get_mut(&id)
            .ok_or(SourceError::NotFound)?;
        stored.status = transaction.status;
        Ok(())
    }
}
