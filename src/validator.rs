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

//! Transaction validation rules.
//!
//! Every rule is evaluated; errors accumulate in a fixed order (type, date,
//! label, then the amount rule for the transaction type) so the messages a
//! caller sees do not depend on which combination of rules failed.

use crate::error::ValidationError;
use crate::transaction::{Transaction, TransactionType};
use rust_decimal::Decimal;

/// Checks a transaction against all rules. An empty list means valid.
pub fn validate(transaction: &Transaction) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if transaction.kind.is_none() {
        errors.push(ValidationError::MissingType);
    }
    if transaction.date.is_none() {
        errors.push(ValidationError::MissingDate);
    }
    if transaction.label.as_deref().is_none_or(str::is_empty) {
        errors.push(ValidationError::MissingLabel);
    }

    match transaction.kind {
        Some(TransactionType::Credit) if transaction.amount <= Decimal::ZERO => {
            errors.push(ValidationError::NonPositiveCredit);
        }
        Some(TransactionType::Debit) if transaction.amount <= Decimal::ZERO => {
            errors.push(ValidationError::NonPositiveDebit);
        }
        _ => {}
    }

    errors
}

/// Joins error messages with newlines, one message per line.
pub fn join_messages(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
