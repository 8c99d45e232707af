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

//! Bank account balances.
//!
//! Each [`Account`] serializes its own read-modify-write updates behind a
//! mutex, so concurrent deltas on the same account never interleave.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use ledger_scheduler_rs::{Account, AccountId, Money, OverdraftPolicy};
//!
//! let account = Account::new(AccountId(1), Money::ZERO);
//! account.apply_delta(Money::new(dec!(25.00)), OverdraftPolicy::Reject).unwrap();
//! assert_eq!(account.balance(), Money::new(dec!(25.00)));
//! ```

use crate::base::AccountId;
use crate::error::LedgerRejection;
use crate::money::Money;
use parking_lot::Mutex;
use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};

/// Whether a debit may leave an account below zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverdraftPolicy {
    Allow,
    #[default]
    Reject,
}

#[derive(Debug)]
struct AccountData {
    account_id: AccountId,
    balance: Money,
}

impl AccountData {
    fn apply(&mut self, delta: Money, policy: OverdraftPolicy) -> Result<Money, LedgerRejection> {
        let updated = self
            .balance
            .checked_add(delta)
            .map_err(|source| LedgerRejection::InvalidBalance {
                account_id: self.account_id,
                source,
            })?;

        // A debit that would cross zero is refused; a balance that is already
        // negative may still receive credits.
        if policy == OverdraftPolicy::Reject && updated.is_negative() && delta.is_negative() {
            return Err(LedgerRejection::InsufficientFunds(self.account_id));
        }

        self.balance = updated;
        Ok(updated)
    }
}

/// Ledger account.
#[derive(Debug)]
pub struct Account {
    inner: Mutex<AccountData>,
}

impl Account {
    const DECIMAL_PRECISION: u32 = 4;

    /// Creates an account holding `opening`, which may be [`Money::ABSENT`]
    /// for an account whose balance has never been set.
    pub fn new(account_id: AccountId, opening: Money) -> Self {
        Self {
            inner: Mutex::new(AccountData {
                account_id,
                balance: opening,
            }),
        }
    }

    pub fn account_id(&self) -> AccountId {
        self.inner.lock().account_id
    }

    pub fn balance(&self) -> Money {
        self.inner.lock().balance
    }

    /// Adds `delta` to the balance and returns the new balance.
    ///
    /// # Errors
    ///
    /// - [`LedgerRejection::InvalidBalance`] - balance or delta is absent, or the sum overflows.
    /// - [`LedgerRejection::InsufficientFunds`] - debit would go below zero under
    ///   [`OverdraftPolicy::Reject`].
    ///
    /// The balance is unchanged on error.
    pub fn apply_delta(
        &self,
        delta: Money,
        policy: OverdraftPolicy,
    ) -> Result<Money, LedgerRejection> {
        self.inner.lock().apply(delta, policy)
    }
}

impl Serialize for Account {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let data = self.inner.lock();
        let mut state = serializer.serialize_struct("Account", 2)?;
        state.serialize_field("account", &data.account_id)?;
        state.serialize_field("balance", &data.balance.round_dp(Account::DECIMAL_PRECISION))?;
        state.end()
    }
}
