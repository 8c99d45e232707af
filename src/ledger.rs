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

//! Account ledger contract and its in-memory implementation.
//!
//! The ledger is the only place balances change. Implementations must
//! serialize concurrent updates to the same account while letting updates to
//! different accounts proceed independently.

use crate::account::{Account, OverdraftPolicy};
use crate::base::AccountId;
use crate::error::LedgerRejection;
use crate::money::Money;
use dashmap::DashMap;

/// Owner of account balances.
pub trait AccountLedger: Send + Sync {
    /// Adds a signed delta to the balance of `account_id` and returns the new
    /// balance.
    ///
    /// # Errors
    ///
    /// A [`LedgerRejection`] when the ledger refuses the update; the balance
    /// is left untouched.
    fn apply_delta(&self, account_id: AccountId, delta: Money) -> Result<Money, LedgerRejection>;

    /// Current balance, or `None` for an unknown account.
    fn balance(&self, account_id: AccountId) -> Option<Money>;
}

/// Ledger keeping accounts in memory.
///
/// Accounts live in a [`DashMap`]; each [`Account`] carries its own lock, so
/// two deltas for the same account run one after the other and deltas for
/// different accounts do not wait on each other.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    accounts: DashMap<AccountId, Account>,
    overdraft: OverdraftPolicy,
}

impl InMemoryLedger {
    pub fn new(overdraft: OverdraftPolicy) -> Self {
        Self {
            accounts: DashMap::new(),
            overdraft,
        }
    }

    pub fn overdraft(&self) -> OverdraftPolicy {
        self.overdraft
    }

    /// Registers an account, replacing any existing one with the same id.
    pub fn open_account(&self, account_id: AccountId, opening: Money) {
        self.accounts.insert(account_id, Account::new(account_id, opening));
    }

    /// Returns an iterator over all accounts.
    pub fn accounts(
        &self,
    ) -> impl Iterator<Item = dashmap::mapref::multiple::RefMulti<'_, AccountId, Account>> {
        self.accounts.iter()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

impl AccountLedger for InMemoryLedger {
    fn apply_delta(&self, account_id: AccountId, delta: Money) -> Result<Money, LedgerRejection> {
        // Shared shard guard only; the account's own mutex does the serializing.
        let account = self
            .accounts
            .get(&account_id)
            .ok_or(LedgerRejection::AccountNotFound(account_id))?;
        account.apply_delta(delta, self.overdraft)
    }

    fn balance(&self, account_id: AccountId) -> Option<Money> {
        self.accounts.get(&account_id).map(|account| account.balance())
    }
}
