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

//! Error types for validation, ledger updates and scheduling.

use crate::base::AccountId;
use thiserror::Error;

/// Monetary arithmetic errors.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoneyError {
    /// One of the operands holds no value
    #[error("invalid operand: money value is absent")]
    InvalidOperand,

    /// Result does not fit in the decimal representation
    #[error("arithmetic overflow")]
    Overflow,
}

/// A structural or business rule violated by a transaction.
///
/// The display strings are part of the caller-visible contract and must
/// not change.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Transaction type must not be null.")]
    MissingType,

    #[error("Transaction date must not be null.")]
    MissingDate,

    #[error("Transaction label must not be null.")]
    MissingLabel,

    #[error("Credit transaction amount must be greater than 0.")]
    NonPositiveCredit,

    #[error("Debit transaction amount must be greater than 0.")]
    NonPositiveDebit,
}

/// Reasons an [`AccountLedger`](crate::AccountLedger) refuses to apply a delta.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerRejection {
    /// No account is registered under the identifier
    #[error("account {0} not found")]
    AccountNotFound(AccountId),

    /// The delta would drive the balance below zero
    #[error("insufficient funds on account {0}")]
    InsufficientFunds(AccountId),

    /// The balance or the delta cannot take part in arithmetic
    #[error("cannot update balance of account {account_id}: {source}")]
    InvalidBalance {
        account_id: AccountId,
        source: MoneyError,
    },
}

/// Failures of the transaction storage backing a
/// [`TransactionSource`](crate::TransactionSource).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// Storage did not answer
    #[error("transaction source unavailable: {0}")]
    Unavailable(String),

    /// The transaction to update is unknown to storage
    #[error("transaction not found in source")]
    NotFound,

    /// Every transaction id has been handed out
    #[error("no transaction id left to assign")]
    IdSpaceExhausted,
}

/// Reasons a drain cycle ends without draining anything.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CycleError {
    /// Another cycle holds the scheduler; the trigger was dropped
    #[error("a drain cycle is already running")]
    AlreadyDraining,

    /// Refill failed; the next trigger retries
    #[error(transparent)]
    SourceUnavailable(#[from] SourceError),
}

/// Configuration loading errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
