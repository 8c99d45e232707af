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

//! Arbitrary-precision monetary values.
//!
//! [`Money`] wraps an optional [`Decimal`]. The absent value stands for a
//! balance that has never been set and is observably different from zero:
//! it compares below every present amount and refuses to take part in
//! arithmetic.
//!
//! # Example
//!
//! ```
//! use ledger_scheduler_rs::{Money, MoneyError};
//! use rust_decimal_macros::dec;
//!
//! let balance = Money::new(dec!(100.00));
//! assert_eq!(balance.checked_sub(Money::new(dec!(40))), Ok(Money::new(dec!(60))));
//! assert_eq!(Money::ABSENT.checked_add(balance), Err(MoneyError::InvalidOperand));
//! assert_ne!(Money::ABSENT, Money::ZERO);
//! ```

use crate::error::MoneyError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A signed decimal amount, or no amount at all.
///
/// Ordering is total: [`Money::ABSENT`] sorts before every present value and
/// present values compare by exact decimal value, so `1.0 == 1.00`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Option<Decimal>);

impl Money {
    pub const ABSENT: Money = Money(None);
    pub const ZERO: Money = Money(Some(Decimal::ZERO));

    pub const fn new(value: Decimal) -> Self {
        Self(Some(value))
    }

    pub const fn absent() -> Self {
        Self::ABSENT
    }

    pub const fn value(&self) -> Option<Decimal> {
        self.0
    }

    pub const fn is_absent(&self) -> bool {
        self.0.is_none()
    }

    /// True only for a present value below zero.
    pub fn is_negative(&self) -> bool {
        matches!(self.0, Some(value) if value.is_sign_negative() && !value.is_zero())
    }

    /// Adds two amounts.
    ///
    /// # Errors
    ///
    /// - [`MoneyError::InvalidOperand`] if either side is absent.
    /// - [`MoneyError::Overflow`] if the sum does not fit.
    pub fn checked_add(self, other: Money) -> Result<Money, MoneyError> {
        let (lhs, rhs) = self.operands(other)?;
        lhs.checked_add(rhs).map(Money::new).ok_or(MoneyError::Overflow)
    }

    /// Subtracts `other` from `self`.
    ///
    /// # Errors
    ///
    /// Same as [`Money::checked_add`].
    pub fn checked_sub(self, other: Money) -> Result<Money, MoneyError> {
        let (lhs, rhs) = self.operands(other)?;
        lhs.checked_sub(rhs).map(Money::new).ok_or(MoneyError::Overflow)
    }

    pub fn checked_neg(self) -> Result<Money, MoneyError> {
        self.0
            .map(|value| Money::new(-value))
            .ok_or(MoneyError::InvalidOperand)
    }

    /// Three-way comparison; absent is less than any present value.
    pub fn compare(&self, other: &Money) -> Ordering {
        self.cmp(other)
    }

    /// Rounds to `dp` decimal places using banker's rounding. Absent stays absent.
    pub fn round_dp(&self, dp: u32) -> Money {
        Money(self.0.map(|value| value.round_dp(dp)))
    }

    fn operands(self, other: Money) -> Result<(Decimal, Decimal), MoneyError> {
        match (self.0, other.0) {
            (Some(lhs), Some(rhs)) => Ok((lhs, rhs)),
            _ => Err(MoneyError::InvalidOperand),
        }
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Money::new(value)
    }
}

impl From<Option<Decimal>> for Money {
    fn from(value: Option<Decimal>) -> Self {
        Money(value)
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Money::new(Decimal::from(value))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(value) => write!(f, "{value}"),
            None => f.write_str("absent"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn absent_is_distinct_from_zero() {
        assert_ne!(Money::ABSENT, Money::ZERO);
        assert_eq!(Money::ABSENT.compare(&Money::ZERO), Ordering::Less);
        assert_eq!(Money::ZERO.compare(&Money::ABSENT), Ordering::Greater);
        assert_eq!(Money::ABSENT.compare(&Money::absent()), Ordering::Equal);
    }

    #[test]
    fn absent_sorts_below_negative_amounts() {
        assert!(Money::ABSENT < Money::new(dec!(-1000000)));
    }

    #[test]
    fn equality_is_exact_on_decimal_value() {
        assert_eq!(Money::new(dec!(1.0)), Money::new(dec!(1.00)));
        assert_ne!(Money::new(dec!(0.1)), Money::new(dec!(0.10000001)));
        assert_eq!(
            Money::new(dec!(0.1)).compare(&Money::new(dec!(0.2))),
            Ordering::Less
        );
    }

    #[test]
    fn addition_has_no_rounding_error() {
        let sum = Money::new(dec!(0.1)).checked_add(Money::new(dec!(0.2))).unwrap();
        assert_eq!(sum, Money::new(dec!(0.3)));
    }

    #[test]
    fn subtraction_can_go_negative() {
        let result = Money::from(50).checked_sub(Money::from(80)).unwrap();
        assert_eq!(result, Money::from(-30));
        assert!(result.is_negative());
    }

    #[test]
    fn arithmetic_on_absent_fails_fast() {
        assert_eq!(
            Money::ABSENT.checked_add(Money::from(1)),
            Err(MoneyError::InvalidOperand)
        );
        assert_eq!(
            Money::from(1).checked_sub(Money::ABSENT),
            Err(MoneyError::InvalidOperand)
        );
        assert_eq!(Money::ABSENT.checked_neg(), Err(MoneyError::InvalidOperand));
    }

    #[test]
    fn overflow_is_reported() {
        let max = Money::new(Decimal::MAX);
        assert_eq!(max.checked_add(Money::from(1)), Err(MoneyError::Overflow));
    }

    #[test]
    fn zero_is_not_negative() {
        assert!(!Money::ZERO.is_negative());
        assert!(!Money::new(dec!(-0.00)).is_negative());
        assert!(!Money::ABSENT.is_negative());
    }

    #[test]
    fn display_formats() {
        assert_eq!(Money::new(dec!(12.50)).to_string(), "12.50");
        assert_eq!(Money::ABSENT.to_string(), "absent");
    }

    #[test]
    fn serializes_as_decimal_string_or_null() {
        assert_eq!(
            serde_json::to_string(&Money::new(dec!(10.25))).unwrap(),
            "\"10.25\""
        );
        assert_eq!(serde_json::to_string(&Money::ABSENT).unwrap(), "null");
        let parsed: Money = serde_json::from_str("\"3.5\"").unwrap();
        assert_eq!(parsed, Money::new(dec!(3.5)));
    }

    #[test]
    fn round_dp_uses_bankers_rounding() {
        assert_eq!(
            Money::new(dec!(0.00015)).round_dp(4),
            Money::new(dec!(0.0002))
        );
        assert_eq!(Money::ABSENT.round_dp(4), Money::ABSENT);
    }
}
