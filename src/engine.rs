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

//! Wallet and entitlement engine.
//!
//! The [`Engine`] is the public face of the crate: account registration,
//! wallet mutations, access decisions, and settlement callbacks. Every
//! operation against one account runs as a single atomic unit inside the
//! [`LedgerStore`]; commits are then journaled and reported to the
//! notification dispatcher, both outside the lock so neither can block or
//! roll back a commit.
//!
//! # Thread safety
//!
//! Accounts live in a concurrent map and each carries its own mutex, so
//! operations on different accounts proceed in parallel while commits per
//! account observe a strict total order.

use crate::base::{AccountId, Category, ItemId};
use crate::entitlement::{self, AccessResult, CatalogItem};
use crate::error::LedgerError;
use crate::journal::{AuditEntry, AuditJournal};
use crate::notify::{LedgerEvent, Notifier, NullNotifier};
use crate::purchase::{PaymentMethod, PurchaseRecord};
use crate::store::{self, LedgerStore};
use crate::transaction::{NewTransaction, Transaction, TransactionKind};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Prediction-platform wallet engine.
pub struct Engine {
    store: LedgerStore,
    journal: AuditJournal,
    notifier: Arc<dyn Notifier>,
}

impl Engine {
    /// Creates an engine with no accounts and a no-op notifier.
    pub fn new() -> Self {
        Self::with_notifier(Arc::new(NullNotifier))
    }

    /// Creates an engine that reports post-commit events to `notifier`.
    pub fn with_notifier(notifier: Arc<dyn Notifier>) -> Self {
        Engine {
            store: LedgerStore::new(),
            journal: AuditJournal::new(),
            notifier,
        }
    }

    /// Registers a zero-balance account. The 7-day trial window and the
    /// trial category are fixed here and never change.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::AccountExists`] - the ID is already registered.
    pub fn register_account(
        &self,
        account_id: AccountId,
        selected_category: Category,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        self.store.create(account_id, selected_category.clone(), now)?;
        tracing::debug!(account = %account_id, category = %selected_category, "account registered");
        Ok(())
    }

    /// Applies one wallet mutation and returns the persisted transaction
    /// (with its assigned position and timestamp).
    ///
    /// Withdrawals commit as `Pending` but decrement the balance
    /// immediately; every other kind commits as `Completed`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::AccountNotFound`] - no such account.
    /// - [`LedgerError::InvalidAmount`] - amount is zero or negative.
    /// - [`LedgerError::InsufficientBalance`] - an outflow would take the
    ///   balance below zero; nothing is appended.
    pub fn apply_transaction(
        &self,
        account_id: AccountId,
        request: NewTransaction,
        now: DateTime<Utc>,
    ) -> Result<Transaction, LedgerError> {
        let (transaction, balance, trial_consumed) = store::run_retrying(|| {
            self.store.with_account(account_id, |data| {
                let trial_consumed = data.trial.mark_consumed_if_expired(now);
                let transaction = data.apply(request.clone(), now)?;
                Ok((transaction, data.balance, trial_consumed))
            })
        })?;

        self.record_commit(account_id, &transaction, balance);
        if trial_consumed {
            self.notifier.notify(&LedgerEvent::TrialConsumed { account_id });
        }
        Ok(transaction)
    }

    /// Resolves whether `account_id` may access `item`, and how.
    ///
    /// With `method: None` the request is a plain view: it can return
    /// `Owned`, `FreeAccess`, `TrialExhaustedToday`, or `PurchaseRequired`.
    /// With a payment method it is an explicit purchase: `Purchased` or
    /// `PaymentIntent`; buying an already-owned item is `AlreadyPurchased`.
    /// The whole decision, including the uniqueness check, the debit, and
    /// the record insert, is one atomic unit per account.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::AccountNotFound`] - no such account.
    /// - [`LedgerError::ItemUnavailable`] - catalog reports the item inactive.
    /// - [`LedgerError::RedundantDuringTrial`] - buying an item that is free
    ///   today via the trial.
    /// - [`LedgerError::InsufficientBalance`] - ledger purchase exceeds the
    ///   balance; nothing is charged or recorded.
    /// - [`LedgerError::AlreadyPurchased`] - a completed record already
    ///   exists, whether from an earlier call or from losing a concurrent
    ///   double-submit; the caller was not charged.
    pub fn request_access(
        &self,
        account_id: AccountId,
        item: &CatalogItem,
        method: Option<PaymentMethod>,
        now: DateTime<Utc>,
    ) -> Result<AccessResult, LedgerError> {
        let (result, balance, trial_consumed) = store::run_retrying(|| {
            self.store.with_account(account_id, |data| {
                let trial_consumed = data.trial.mark_consumed_if_expired(now);
                let result = entitlement::resolve_access(data, item, method, now)?;
                Ok((result, data.balance, trial_consumed))
            })
        })?;

        if let AccessResult::Purchased { reference } = &result {
            self.journal_entry(AuditEntry {
                reference: reference.clone(),
                account_id,
                kind: TransactionKind::Payment,
                amount: item.price,
                recorded_at: now,
            });
            self.notifier.notify(&LedgerEvent::PurchaseCompleted {
                account_id,
                item_id: item.id,
                amount: item.price,
            });
            self.notifier.notify(&LedgerEvent::BalanceChanged {
                account_id,
                balance,
            });
        }
        if trial_consumed {
            self.notifier.notify(&LedgerEvent::TrialConsumed { account_id });
        }
        tracing::debug!(account = %account_id, item = %item.id, result = ?result, "access resolved");
        Ok(result)
    }

    /// Completion callback for purchases deferred to the external gateway.
    ///
    /// On reported success the completed purchase record is created (the
    /// uniqueness guard applies); on failure nothing is persisted and
    /// `Ok(None)` is returned.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::AccountNotFound`] - no such account.
    /// - [`LedgerError::AlreadyPurchased`] - a completed record already
    ///   exists for this (account, item).
    pub fn settle_gateway_purchase(
        &self,
        account_id: AccountId,
        item_id: ItemId,
        amount: Decimal,
        gateway_ref: &str,
        success: bool,
        now: DateTime<Utc>,
    ) -> Result<Option<PurchaseRecord>, LedgerError> {
        let record = store::run_retrying(|| {
            self.store.with_account(account_id, |data| {
                entitlement::settle_gateway(data, item_id, amount, gateway_ref, success, now)
            })
        })?;

        if let Some(record) = &record {
            self.journal_entry(AuditEntry {
                reference: record.transaction_ref.clone(),
                account_id,
                kind: TransactionKind::Payment,
                amount,
                recorded_at: now,
            });
            self.notifier.notify(&LedgerEvent::PurchaseCompleted {
                account_id,
                item_id,
                amount,
            });
        } else {
            tracing::debug!(account = %account_id, item = %item_id, gateway_ref, "gateway settlement failed; nothing persisted");
        }
        Ok(record)
    }

    /// Marks a pending withdrawal settled; the balance does not move.
    pub fn settle_withdrawal(
        &self,
        account_id: AccountId,
        seq: u64,
    ) -> Result<Transaction, LedgerError> {
        store::run_retrying(|| {
            self.store
                .with_account(account_id, |data| data.settle_withdrawal(seq))
        })
    }

    /// Cancels a pending withdrawal and returns the compensating refund
    /// transaction.
    pub fn cancel_withdrawal(
        &self,
        account_id: AccountId,
        seq: u64,
        now: DateTime<Utc>,
    ) -> Result<Transaction, LedgerError> {
        let (refund, balance) = store::run_retrying(|| {
            self.store.with_account(account_id, |data| {
                let refund = data.cancel_withdrawal(seq, now)?;
                Ok((refund, data.balance))
            })
        })?;
        self.record_commit(account_id, &refund, balance);
        Ok(refund)
    }

    /// Observes an authenticated access without any wallet operation,
    /// applying the lazy trial-expiry transition. Returns whether the
    /// consumed flag flipped on this call.
    pub fn observe_account(
        &self,
        account_id: AccountId,
        now: DateTime<Utc>,
    ) -> Result<bool, LedgerError> {
        let flipped = store::run_retrying(|| {
            self.store.with_account(account_id, |data| {
                Ok(data.trial.mark_consumed_if_expired(now))
            })
        })?;
        if flipped {
            self.notifier.notify(&LedgerEvent::TrialConsumed { account_id });
        }
        Ok(flipped)
    }

    /// Retrieves an account by ID.
    ///
    /// Returns `None` if no account is registered under the ID.
    pub fn get_account(
        &self,
        account_id: &AccountId,
    ) -> Option<dashmap::mapref::one::Ref<'_, AccountId, crate::Account>> {
        self.store.get(account_id)
    }

    /// Returns an iterator over all accounts, for statement reports.
    pub fn accounts(
        &self,
    ) -> impl Iterator<Item = dashmap::mapref::multiple::RefMulti<'_, AccountId, crate::Account>>
    {
        self.store.iter()
    }

    /// The global audit trail of committed movements.
    pub fn journal(&self) -> &AuditJournal {
        &self.journal
    }

    fn record_commit(&self, account_id: AccountId, transaction: &Transaction, balance: Decimal) {
        self.journal_entry(AuditEntry {
            reference: transaction.audit_ref(account_id).to_string(),
            account_id,
            kind: transaction.kind,
            amount: transaction.amount,
            recorded_at: transaction.created_at,
        });
        self.notifier.notify(&LedgerEvent::BalanceChanged {
            account_id,
            balance,
        });
        tracing::debug!(
            account = %account_id,
            seq = transaction.seq,
            kind = %transaction.kind,
            amount = %transaction.amount,
            "transaction committed"
        );
    }

    fn journal_entry(&self, entry: AuditEntry) {
        // A rejection here is a bug-level anomaly, never a reason to roll
        // back the already-final commit.
        if let Err(err) = self.journal.push(entry) {
            tracing::warn!(error = %err, "audit journal rejected committed entry");
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
