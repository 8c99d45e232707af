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

//! # Ledger Scheduler
//!
//! This library applies pending bank transactions to account balances in
//! strict scheduled-date order, on a periodic cadence, with validation and
//! per-transaction failure isolation.
//!
//! ## Core Components
//!
//! - [`Money`]: Arbitrary-precision amount that can also be absent
//! - [`Transaction`]: A requested credit or debit, validated by [`validator::validate`]
//! - [`TransactionQueue`]: Earliest-date-first holding area for one refill batch
//! - [`TransactionProcessor`]: Validates a transaction and applies it to an [`AccountLedger`]
//! - [`Scheduler`]: Refills, drains and guards against overlapping cycles
//! - [`timer::spawn`]: Fixed-period trigger for a [`Scheduler`]
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use chrono::Utc;
//! use ledger_scheduler_rs::{
//!     AccountId, AccountLedger, InMemoryLedger, InMemoryTransactionStore, Money,
//!     OverdraftPolicy, Scheduler, Transaction, TransactionProcessor, TransactionType,
//! };
//! use rust_decimal_macros::dec;
//!
//! let ledger = Arc::new(InMemoryLedger::new(OverdraftPolicy::Reject));
//! ledger.open_account(AccountId(1), Money::ZERO);
//!
//! let store = Arc::new(InMemoryTransactionStore::new());
//! store
//!     .insert(Transaction::new(
//!         AccountId(1),
//!         dec!(100.00),
//!         TransactionType::Credit,
//!         Utc::now(),
//!         "Deposit of 100 euros",
//!     ))
//!     .unwrap();
//!
//! let scheduler = Scheduler::new(store, TransactionProcessor::new(ledger.clone()));
//! let report = scheduler.process_queue().unwrap();
//!
//! assert_eq!(report.processed(), 1);
//! assert_eq!(ledger.balance(AccountId(1)), Some(Money::new(dec!(100.00))));
//! ```
//!
//! ## Thread Safety
//!
//! A [`Scheduler`] runs at most one drain cycle at a time. The
//! [`InMemoryLedger`] serializes updates per account and lets different
//! accounts proceed in parallel.

pub mod account;
mod base;
pub mod config;
pub mod error;
pub mod ledger;
mod money;
pub mod processor;
pub mod scheduler;
pub mod source;
pub mod telemetry;
pub mod timer;
mod transaction;
mod transaction_queue;
pub mod validator;

pub use account::{Account, OverdraftPolicy};
pub use base::{AccountId, TransactionId};
pub use config::SchedulerConfig;
pub use error::{
    ConfigError, CycleError, LedgerRejection, MoneyError, SourceError, ValidationError,
};
pub use ledger::{AccountLedger, InMemoryLedger};
pub use money::Money;
pub use processor::{ProcessingOutcome, TransactionProcessor};
pub use scheduler::{CycleReport, Scheduler};
pub use source::{InMemoryTransactionStore, TransactionSource};
pub use transaction::{Transaction, TransactionStatus, TransactionType};
pub use transaction_queue::TransactionQueue;
