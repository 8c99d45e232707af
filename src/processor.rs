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

//! Transaction processing.
//!
//! The [`TransactionProcessor`] turns one validated transaction into one
//! balance update and reports the resulting status.
//!
//! | Type | Effect on the ledger |
//! |------|----------------------|
//! | Credit | balance increases by `amount` |
//! | Debit | balance decreases by `amount` |
//!
//! A transaction that fails validation never reaches the ledger. A ledger
//! rejection is reported as an error for that transaction only; there is no
//! retry here. Re-submitting is up to whoever owns transaction storage.

use crate::error::{LedgerRejection, ValidationError};
use crate::ledger::AccountLedger;
use crate::money::Money;
use crate::transaction::{Transaction, TransactionStatus, TransactionType};
use crate::validator;
use std::sync::Arc;

/// Result of processing a single transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingOutcome {
    /// The ledger applied the delta; `balance` is the account's new balance.
    Processed { balance: Money },
    /// Validation or the ledger refused the transaction.
    Error { reasons: Vec<String> },
}

impl ProcessingOutcome {
    fn invalid(errors: &[ValidationError]) -> Self {
        Self::Error {
            reasons: errors.iter().map(ToString::to_string).collect(),
        }
    }

    fn rejected(rejection: &LedgerRejection) -> Self {
        Self::Error {
            reasons: vec![rejection.to_string()],
        }
    }

    /// Status the transaction moves to.
    pub fn status(&self) -> TransactionStatus {
        match self {
            Self::Processed { .. } => TransactionStatus::Processed,
            Self::Error { .. } => TransactionStatus::Error,
        }
    }

    pub fn is_processed(&self) -> bool {
        matches!(self, Self::Processed { .. })
    }

    /// Error reasons joined by newlines, `None` when processed.
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Processed { .. } => None,
            Self::Error { reasons } => Some(reasons.join("\n")),
        }
    }
}

/// Applies transactions to an [`AccountLedger`].
#[derive(Clone)]
pub struct TransactionProcessor {
    ledger: Arc<dyn AccountLedger>,
}

impl TransactionProcessor {
    pub fn new(ledger: Arc<dyn AccountLedger>) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &Arc<dyn AccountLedger> {
        &self.ledger
    }

    /// Validates `transaction` and, if valid, applies its signed delta.
    pub fn process(&self, transaction: &Transaction) -> ProcessingOutcome {
        let errors = validator::validate(transaction);
        let kind = match (transaction.kind, errors.as_slice()) {
            (Some(kind), []) => kind,
            _ => {
                tracing::debug!(
                    id = ?transaction.id,
                    errors = errors.len(),
                    "transaction failed validation"
                );
                return ProcessingOutcome::invalid(&errors);
            }
        };

        let delta = match kind {
            TransactionType::Credit => Money::new(transaction.amount),
            TransactionType::Debit => Money::new(-transaction.amount),
        };

        match self.ledger.apply_delta(transaction.account_id, delta) {
            Ok(balance) => {
                tracing::debug!(
                    id = ?transaction.id,
                    account = %transaction.account_id,
                    %delta,
                    %balance,
                    "transaction applied"
                );
                ProcessingOutcome::Processed { balance }
            }
            Err(rejection) => {
                tracing::warn!(
                    id = ?transaction.id,
                    account = %transaction.account_id,
                    "ledger rejected transaction: {}",
                    rejection
                );
                ProcessingOutcome::rejected(&rejection)
            }
        }
    }
}
