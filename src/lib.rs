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

//! # Tipvault
//!
//! Wallet ledger and purchase/entitlement engine for a prediction-selling
//! platform: accounts hold a money balance with an append-only transaction
//! trail, a 7-day trial gates one free item per day in a selected category,
//! and paid items are unlocked at most once per account.
//!
//! ## Core components
//!
//! - [`Engine`]: public API tying the ledger store, audit journal, and
//!   notification boundary together
//! - [`Account`]: per-user wallet with balance, lifetime totals, trial
//!   state, and the transaction log
//! - [`AccessResult`]: the resolved answer to "may this account access this
//!   item, and how"
//! - [`LedgerError`]: typed rejections for every failure mode
//!
//! ## Example
//!
//! ```
//! use chrono::Utc;
//! use rust_decimal_macros::dec;
//! use tipvault::{
//!     AccessResult, AccountId, CatalogItem, Category, Engine, ItemId, NewTransaction,
//!     PaymentMethod, TransactionKind,
//! };
//!
//! let engine = Engine::new();
//! let now = Utc::now();
//! engine
//!     .register_account(AccountId(1), Category::from("powerball"), now)
//!     .unwrap();
//!
//! // Fund the wallet.
//! let credit = NewTransaction::new(TransactionKind::Credit, dec!(5.00), "top-up");
//! engine.apply_transaction(AccountId(1), credit, now).unwrap();
//!
//! // Buy a prediction outside the trial category.
//! let item = CatalogItem {
//!     id: ItemId(42),
//!     price: dec!(2.00),
//!     category: Category::from("mega"),
//!     is_active: true,
//! };
//! let result = engine
//!     .request_access(AccountId(1), &item, Some(PaymentMethod::Ledger), now)
//!     .unwrap();
//! assert!(matches!(result, AccessResult::Purchased { .. }));
//! assert_eq!(engine.get_account(&AccountId(1)).unwrap().balance(), dec!(3.00));
//! ```
//!
//! ## Thread safety
//!
//! Each account carries its own lock inside a concurrent map: operations on
//! one account observe a strict total order, operations on different
//! accounts run in parallel.

pub mod account;
mod base;
mod engine;
mod entitlement;
pub mod error;
mod journal;
mod notify;
mod purchase;
mod store;
mod transaction;
mod trial;

pub use account::Account;
pub use base::{AccountId, Category, ItemId, TransactionRef};
pub use engine::Engine;
pub use entitlement::{AccessResult, CatalogItem};
pub use error::LedgerError;
pub use journal::{AuditEntry, AuditJournal};
pub use notify::{LedgerEvent, Notifier, NullNotifier};
pub use purchase::{PaymentMethod, PaymentStatus, PurchaseRecord};
pub use store::LedgerStore;
pub use transaction::{
    NewTransaction, Transaction, TransactionDetail, TransactionKind, TransactionStatus,
};
pub use trial::{TRIAL_DAYS, TrialState};
