// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Tipvault Authors
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

use chrono::Utc;
use clap::Parser;
use csv::{ReaderBuilder, Trim, Writer};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;
use tipvault::{
    AccountId, CatalogItem, Category, Engine, ItemId, NewTransaction, PaymentMethod,
    TransactionKind,
};
use tracing_subscriber::EnvFilter;

/// Tipvault - Replay wallet operation CSV files
///
/// Reads wallet operations from a CSV file and outputs account statements
/// to stdout. Supports registration, funding, withdrawals, and prediction
/// access/purchase requests.
#[derive(Parser, Debug)]
#[command(name = "tipvault")]
#[command(about = "A wallet engine that replays operation CSVs", long_about = None)]
struct Args {
    /// Path to CSV file with operations
    ///
    /// Expected format: op,account,amount,category,item,price,method
    /// Example: cargo run -- operations.csv > statements.csv
    #[arg(value_name = "FILE")]
    input: PathBuf,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let file = match File::open(&args.input) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error opening file '{}': {}", args.input.display(), e);
            process::exit(1);
        }
    };

    let engine = match process_operations(BufReader::new(file)) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error processing operations: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = write_statements(&engine, std::io::stdout()) {
        eprintln!("Error writing output: {}", e);
        process::exit(1);
    }
}

/// Raw CSV record matching the input format.
///
/// Fields: `op, account, amount, category, item, price, method`
#[derive(Debug, Deserialize)]
struct CsvRecord {
    op: String,
    account: u64,
    #[serde(deserialize_with = "csv::invalid_option")]
    amount: Option<Decimal>,
    #[serde(default)]
    category: Option<String>,
    #[serde(deserialize_with = "csv::invalid_option", default)]
    item: Option<u64>,
    #[serde(deserialize_with = "csv::invalid_option", default)]
    price: Option<Decimal>,
    #[serde(default)]
    method: Option<String>,
}

/// One replayable wallet operation.
#[derive(Debug)]
enum Operation {
    Register {
        account: AccountId,
        category: Category,
    },
    Wallet {
        account: AccountId,
        request: NewTransaction,
    },
    Access {
        account: AccountId,
        item: CatalogItem,
        method: Option<PaymentMethod>,
    },
}

impl CsvRecord {
    /// Converts a CSV record to an operation.
    ///
    /// Returns `None` for unknown ops or missing required fields.
    fn into_operation(self) -> Option<Operation> {
        let account = AccountId(self.account);

        let wallet = |kind: TransactionKind, amount: Option<Decimal>| {
            Some(Operation::Wallet {
                account,
                request: NewTransaction::new(kind, amount?, "csv replay"),
            })
        };

        match self.op.to_lowercase().as_str() {
            "register" => Some(Operation::Register {
                account,
                category: Category::new(self.category?),
            }),
            "credit" => wallet(TransactionKind::Credit, self.amount),
            "debit" => wallet(TransactionKind::Debit, self.amount),
            "bonus" => wallet(TransactionKind::Bonus, self.amount),
            "refund" => wallet(TransactionKind::Refund, self.amount),
            "withdrawal" => wallet(TransactionKind::Withdrawal, self.amount),
            "access" | "purchase" => {
                let method = match self.method.as_deref() {
                    Some("ledger") => Some(PaymentMethod::Ledger),
                    Some("gateway") => Some(PaymentMethod::ExternalGateway),
                    _ => None,
                };
                Some(Operation::Access {
                    account,
                    item: CatalogItem {
                        id: ItemId(self.item?),
                        price: self.price?,
                        category: Category::new(self.category?),
                        is_active: true,
                    },
                    method,
                })
            }
            _ => None,
        }
    }
}

/// Replays operations from a CSV reader.
///
/// Streaming parse; malformed rows and rejected operations are skipped so a
/// single bad row never aborts the replay.
///
/// # CSV Format
///
/// Expected columns: `op, account, amount, category, item, price, method`
///
/// ```csv
/// op,account,amount,category,item,price,method
/// register,1,,powerball,,,
/// credit,1,5.00,,,,
/// purchase,1,,mega,42,2.00,ledger
/// ```
///
/// # Errors
///
/// Returns a CSV error if the reader fails or the CSV structure is invalid.
pub fn process_operations<R: Read>(reader: R) -> Result<Engine, csv::Error> {
    let engine = Engine::new();

    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    for result in rdr.deserialize::<CsvRecord>() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                tracing::debug!(error = %e, "skipping malformed row");
                continue;
            }
        };

        let Some(operation) = record.into_operation() else {
            tracing::debug!("skipping invalid operation record");
            continue;
        };

        let now = Utc::now();
        let outcome = match operation {
            Operation::Register { account, category } => {
                engine.register_account(account, category, now)
            }
            Operation::Wallet { account, request } => engine
                .apply_transaction(account, request, now)
                .map(|_| ()),
            Operation::Access {
                account,
                item,
                method,
            } => engine
                .request_access(account, &item, method, now)
                .map(|_| ()),
        };

        if let Err(e) = outcome {
            tracing::debug!(error = %e, "skipping rejected operation");
        }
    }

    Ok(engine)
}

/// Writes account statements to a CSV writer.
///
/// Columns: `account, balance, total_credited, total_debited, transactions,
/// trial_consumed`, money rounded to 2 decimal places.
///
/// # Errors
///
/// Returns a CSV error if writing fails.
pub fn write_statements<W: Write>(engine: &Engine, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);

    for account in engine.accounts() {
        wtr.serialize(&*account)?;
    }

    wtr.flush()?;
    Ok(())
}
