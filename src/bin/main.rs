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

use chrono::{DateTime, Utc};
use clap::Parser;
use csv::{ReaderBuilder, Trim, Writer};
use ledger_scheduler_rs::telemetry::init_tracing;
use ledger_scheduler_rs::{
    AccountId, InMemoryLedger, InMemoryTransactionStore, Money, OverdraftPolicy, Scheduler,
    SchedulerConfig, Transaction, TransactionId, TransactionProcessor, TransactionStatus,
    TransactionType, timer,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

/// Ledger Scheduler - Apply scheduled transactions to account balances
///
/// Loads accounts and pending transactions from CSV files, drains the
/// transactions in scheduled-date order and prints the final balances to
/// stdout.
#[derive(Parser, Debug)]
#[command(name = "ledger-scheduler-rs")]
#[command(about = "Applies pending transactions to account balances in date order", long_about = None)]
struct Args {
    /// Path to CSV file with pending transactions
    ///
    /// Expected format: id,account,type,amount,date,label
    #[arg(value_name = "FILE")]
    transactions: PathBuf,

    /// Path to CSV file with opening balances
    ///
    /// Expected format: account,balance
    #[arg(long, value_name = "FILE")]
    accounts: PathBuf,

    /// JSON configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Seconds between drain cycles (overrides configuration)
    #[arg(long)]
    period_secs: Option<u64>,

    /// Allow debits to drive balances negative
    #[arg(long)]
    allow_overdraft: bool,

    /// Run a single drain cycle and exit
    #[arg(long)]
    once: bool,
}

fn main() {
    let _ = dotenvy::dotenv();
    init_tracing();
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            process::exit(1);
        }
    };

    let ledger = Arc::new(InMemoryLedger::new(config.overdraft));
    if let Err(e) = open_file(&args.accounts).and_then(|f| load_accounts(f, &ledger)) {
        eprintln!("Error loading accounts '{}': {}", args.accounts.display(), e);
        process::exit(1);
    }

    let store = Arc::new(InMemoryTransactionStore::new());
    if let Err(e) = open_file(&args.transactions).and_then(|f| load_transactions(f, &store)) {
        eprintln!(
            "Error loading transactions '{}': {}",
            args.transactions.display(),
            e
        );
        process::exit(1);
    }

    let scheduler = Arc::new(Scheduler::new(
        store.clone(),
        TransactionProcessor::new(ledger.clone()),
    ));

    if args.once {
        if let Err(e) = scheduler.process_queue() {
            eprintln!("Error running drain cycle: {}", e);
            process::exit(1);
        }
    } else if let Err(e) = run_until_interrupted(scheduler, &config) {
        eprintln!("Error running scheduler: {}", e);
        process::exit(1);
    }

    if let Err(e) = write_accounts(&ledger, std::io::stdout()) {
        eprintln!("Error writing output: {}", e);
        process::exit(1);
    }
}

fn load_config(args: &Args) -> Result<SchedulerConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => SchedulerConfig::from_json_str(&fs::read_to_string(path)?)?,
        None => SchedulerConfig::default(),
    }
    .with_env()?;

    if let Some(period_secs) = args.period_secs {
        config.period_secs = period_secs;
    }
    if args.allow_overdraft {
        config.overdraft = OverdraftPolicy::Allow;
    }
    config.validate()?;
    Ok(config)
}

fn open_file(path: &Path) -> Result<BufReader<File>, csv::Error> {
    Ok(BufReader::new(File::open(path)?))
}

fn run_until_interrupted(
    scheduler: Arc<Scheduler>,
    config: &SchedulerConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let handle = timer::spawn(scheduler, config.period())?;
        let interrupted = tokio::signal::ctrl_c().await;
        tracing::info!("shutting down");
        handle.shutdown().await;
        Ok::<_, Box<dyn std::error::Error>>(interrupted?)
    })
}

/// Raw CSV record matching the transaction input format.
///
/// Fields: `id, account, type, amount, date, label`
#[derive(Debug, Deserialize)]
struct TransactionRecord {
    id: Option<u64>,
    account: u64,
    #[serde(rename = "type")]
    tx_type: String,
    amount: Decimal,
    #[serde(default)]
    date: String,
    #[serde(default)]
    label: String,
}

impl TransactionRecord {
    /// Converts the record to a `WAITING` transaction.
    ///
    /// Unknown types, unparseable dates and empty labels are kept as absent so
    /// that validation reports them when the transaction is drained.
    fn into_transaction(self) -> Transaction {
        let kind = match self.tx_type.to_lowercase().as_str() {
            "credit" => Some(TransactionType::Credit),
            "debit" => Some(TransactionType::Debit),
            _ => None,
        };

        Transaction {
            id: self.id.map(TransactionId),
            account_id: AccountId(self.account),
            amount: self.amount,
            kind,
            status: TransactionStatus::Waiting,
            date: parse_date(&self.date),
            label: Some(self.label).filter(|label| !label.is_empty()),
            metadata: BTreeMap::new(),
        }
    }
}

/// Parses an RFC 3339 timestamp, or `min`/`max` for the earliest and latest
/// representable instants.
fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if raw.is_empty() {
        None
    } else if raw.eq_ignore_ascii_case("min") {
        Some(DateTime::<Utc>::MIN_UTC)
    } else if raw.eq_ignore_ascii_case("max") {
        Some(DateTime::<Utc>::MAX_UTC)
    } else {
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|date| date.with_timezone(&Utc))
    }
}

/// Loads pending transactions into the store.
///
/// Malformed rows, including non-empty cells that fail to parse, are skipped
/// and logged.
///
/// # Errors
///
/// Returns a CSV error if the reader fails or the header is invalid.
fn load_transactions<R: Read>(
    reader: R,
    store: &InMemoryTransactionStore,
) -> Result<usize, csv::Error> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    let mut loaded = 0;
    for result in rdr.deserialize::<TransactionRecord>() {
        match result {
            Ok(record) => match store.insert(record.into_transaction()) {
                Ok(_) => loaded += 1,
                Err(e) => tracing::warn!("skipping transaction row: {}", e),
            },
            Err(e) => {
                tracing::warn!("skipping malformed transaction row: {}", e);
            }
        }
    }

    tracing::info!(count = loaded, "transactions loaded");
    Ok(loaded)
}

/// Raw CSV record for an opening balance.
///
/// Fields: `account, balance`; an empty balance opens the account with no
/// balance set, while an unparseable one skips the row.
#[derive(Debug, Deserialize)]
struct AccountRecord {
    account: u64,
    balance: Option<Decimal>,
}

fn load_accounts<R: Read>(reader: R, ledger: &InMemoryLedger) -> Result<usize, csv::Error> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    let mut loaded = 0;
    for result in rdr.deserialize::<AccountRecord>() {
        match result {
            Ok(record) => {
                ledger.open_account(AccountId(record.account), Money::from(record.balance));
                loaded += 1;
            }
            Err(e) => {
                tracing::warn!("skipping malformed account row: {}", e);
            }
        }
    }

    Ok(loaded)
}

/// Write account balances to a CSV writer, ordered by account id.
///
/// # CSV Format
///
/// Columns: `account, balance`
///
/// # Errors
///
/// Returns a CSV error if writing fails.
fn write_accounts<W: Write>(ledger: &InMemoryLedger, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);

    let mut accounts: Vec<_> = ledger.accounts().collect();
    accounts.sort_by_key(|entry| *entry.key());
    for account in accounts {
        wtr.serialize(account.value())?;
    }

    wtr.flush()?;
    Ok(())
}
