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

//! Transaction records.
//!
//! A transaction is created `WAITING` by the storage layer and moves to
//! `PROCESSED` or `ERROR` exactly once, during a single drain cycle:
//! - [`Waiting`] → [`Processed`] (balance updated)
//! - [`Waiting`] → [`Error`] (validation failed or the ledger refused the delta)
//!
//! [`Waiting`]: TransactionStatus::Waiting
//! [`Processed`]: TransactionStatus::Processed
//! [`Error`]: TransactionStatus::Error

use crate::base::{AccountId, TransactionId};
use crate::error::ValidationError;
use crate::validator;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Direction of a balance change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Credit,
    Debit,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    #[default]
    Waiting,
    Processed,
    Error,
}

/// A single requested balance change.
///
/// `kind`, `date` and `label` are optional so that incomplete records coming
/// out of storage can still be represented and rejected by
/// [`validate`](crate::validator::validate) instead of failing earlier.
/// The amount is a magnitude; its sign is never used to pick the direction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    pub id: Option<TransactionId>,
    pub account_id: AccountId,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: Option<TransactionType>,
    #[serde(default)]
    pub status: TransactionStatus,
    pub date: Option<DateTime<Utc>>,
    pub label: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Transaction {
    /// Creates a `WAITING` transaction with no storage id.
    pub fn new(
        account_id: AccountId,
        amount: Decimal,
        kind: TransactionType,
        date: DateTime<Utc>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            account_id,
            amount,
            kind: Some(kind),
            status: TransactionStatus::Waiting,
            date: Some(date),
            label: Some(label.into()),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_id(mut self, id: TransactionId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_status(mut self, status: TransactionStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Returns every rule this transaction breaks, in reporting order.
    ///
    /// # Errors
    ///
    /// The non-empty list of [`ValidationError`]s.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let errors = validator::validate(self);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.status == TransactionStatus::Waiting
    }
}
