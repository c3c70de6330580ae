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

//! Wallet account: balance, lifetime totals, trial state, the append-only
//! transaction log, and the purchase map.
//!
//! All mutation happens under the account's mutex, which is the atomic unit
//! the whole engine is built on: balance recomputation, log append, and
//! purchase-uniqueness checks are indivisible per account.
//!
//! # Example
//!
//! ```
//! use chrono::Utc;
//! use rust_decimal_macros::dec;
//! use tipvault::{Account, AccountId, Category};
//!
//! let account = Account::new(AccountId(1), Category::from("powerball"), Utc::now());
//! assert_eq!(account.balance(), dec!(0.00));
//! ```

use crate::base::{AccountId, Category, ItemId};
use crate::error::LedgerError;
use crate::purchase::PurchaseRecord;
use crate::transaction::{NewTransaction, Transaction, TransactionKind, TransactionStatus};
use crate::trial::TrialState;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::collections::HashMap;

#[derive(Debug)]
pub(crate) struct AccountData {
    pub(crate) id: AccountId,
    pub(crate) balance: Decimal,
    pub(crate) total_credited: Decimal,
    pub(crate) total_debited: Decimal,
    pub(crate) last_transaction_at: Option<DateTime<Utc>>,
    pub(crate) trial: TrialState,
    /// Append-only; insertion order is chronological order.
    pub(crate) transactions: Vec<Transaction>,
    /// Purchases indexed by item for the uniqueness guard.
    pub(crate) purchases: HashMap<ItemId, PurchaseRecord>,
}

impl AccountData {
    pub(crate) fn new(
        id: AccountId,
        selected_category: Category,
        registered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            balance: Decimal::ZERO,
            total_credited: Decimal::ZERO,
            total_debited: Decimal::ZERO,
            last_transaction_at: None,
            trial: TrialState::new(registered_at, selected_category),
            transactions: Vec::new(),
            purchases: HashMap::new(),
        }
    }

    pub(crate) fn assert_invariants(&self) {
        debug_assert!(
            self.balance >= Decimal::ZERO,
            "Invariant violated: balance went negative: {}",
            self.balance
        );
        debug_assert_eq!(
            self.balance,
            self.transactions.iter().map(Transaction::signed_amount).sum::<Decimal>(),
            "Invariant violated: balance diverged from the transaction log"
        );
        debug_assert_eq!(
            self.total_credited - self.total_debited,
            self.balance,
            "Invariant violated: lifetime totals diverged from balance"
        );
    }

    /// Appends one transaction and recomputes balance and totals.
    ///
    /// Outflows that would take the balance below zero fail with
    /// `InsufficientBalance` and append nothing.
    pub(crate) fn apply(
        &mut self,
        request: NewTransaction,
        now: DateTime<Utc>,
    ) -> Result<Transaction, LedgerError> {
        if request.amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount);
        }
        if !request.kind.is_inflow() && self.balance < request.amount {
            return Err(LedgerError::InsufficientBalance);
        }

        let transaction = Transaction {
            seq: self.transactions.len() as u64,
            kind: request.kind,
            amount: request.amount,
            status: request.kind.initial_status(),
            description: request.description,
            reference: request.reference,
            detail: request.detail,
            created_at: now,
        };

        if transaction.kind.is_inflow() {
            self.balance += transaction.amount;
            self.total_credited += transaction.amount;
        } else {
            self.balance -= transaction.amount;
            self.total_debited += transaction.amount;
        }
        self.last_transaction_at = Some(now);
        self.transactions.push(transaction.clone());
        self.assert_invariants();

        Ok(transaction)
    }

    fn pending_withdrawal_mut(&mut self, seq: u64) -> Result<&mut Transaction, LedgerError> {
        let transaction = self
            .transactions
            .get_mut(seq as usize)
            .ok_or(LedgerError::TransactionNotFound)?;
        if transaction.kind != TransactionKind::Withdrawal
            || transaction.status != TransactionStatus::Pending
        {
            return Err(LedgerError::NotPending);
        }
        Ok(transaction)
    }

    /// Marks a pending withdrawal settled. The balance was already
    /// decremented at append time, so nothing moves.
    pub(crate) fn settle_withdrawal(&mut self, seq: u64) -> Result<Transaction, LedgerError> {
        let transaction = self.pending_withdrawal_mut(seq)?;
        transaction.status = TransactionStatus::Completed;
        Ok(transaction.clone())
    }

    /// Cancels a pending withdrawal: marks it `Cancelled` and appends a
    /// compensating refund, so the signed sum over the log still matches the
    /// balance.
    pub(crate) fn cancel_withdrawal(
        &mut self,
        seq: u64,
        now: DateTime<Utc>,
    ) -> Result<Transaction, LedgerError> {
        let amount = {
            let transaction = self.pending_withdrawal_mut(seq)?;
            transaction.status = TransactionStatus::Cancelled;
            transaction.amount
        };

        let refund = NewTransaction::new(
            TransactionKind::Refund,
            amount,
            "withdrawal cancelled",
        )
        .with_detail(crate::transaction::TransactionDetail::WithdrawalReversal {
            original_seq: seq,
        });
        self.apply(refund, now)
    }

    /// The completed purchase record for `item_id`, if any.
    pub(crate) fn completed_purchase(&self, item_id: ItemId) -> Option<&PurchaseRecord> {
        self.purchases.get(&item_id).filter(|r| r.is_completed())
    }

    /// Uniqueness guard: at most one completed record per (account, item).
    /// Must be called with the account lock held, in the same atomic unit as
    /// the charge it follows.
    pub(crate) fn insert_completed_purchase(
        &mut self,
        record: PurchaseRecord,
    ) -> Result<(), LedgerError> {
        if self.completed_purchase(record.item_id).is_some() {
            return Err(LedgerError::AlreadyPurchased);
        }
        self.purchases.insert(record.item_id, record);
        Ok(())
    }
}

/// Wallet account with interior locking.
#[derive(Debug)]
pub struct Account {
    inner: Mutex<AccountData>,
}

impl Account {
    const DECIMAL_PRECISION: u32 = 2;

    /// Creates a zero-balance account; the trial window is fixed here.
    pub fn new(id: AccountId, selected_category: Category, registered_at: DateTime<Utc>) -> Self {
        Self {
            inner: Mutex::new(AccountData::new(id, selected_category, registered_at)),
        }
    }

    pub fn id(&self) -> AccountId {
        self.inner.lock().id
    }

    pub fn balance(&self) -> Decimal {
        self.inner.lock().balance
    }

    pub fn total_credited(&self) -> Decimal {
        self.inner.lock().total_credited
    }

    pub fn total_debited(&self) -> Decimal {
        self.inner.lock().total_debited
    }

    pub fn last_transaction_at(&self) -> Option<DateTime<Utc>> {
        self.inner.lock().last_transaction_at
    }

    pub fn trial(&self) -> TrialState {
        self.inner.lock().trial.clone()
    }

    pub fn transaction_count(&self) -> usize {
        self.inner.lock().transactions.len()
    }

    /// Snapshot of the full audit log, in commit order.
    pub fn transactions(&self) -> Vec<Transaction> {
        self.inner.lock().transactions.clone()
    }

    pub fn transaction(&self, seq: u64) -> Option<Transaction> {
        self.inner.lock().transactions.get(seq as usize).cloned()
    }

    pub fn purchase(&self, item_id: ItemId) -> Option<PurchaseRecord> {
        self.inner.lock().purchases.get(&item_id).cloned()
    }

    /// Runs `f` under the account mutex: the per-account atomic unit.
    pub(crate) fn with_data<R>(&self, f: impl FnOnce(&mut AccountData) -> R) -> R {
        let mut data = self.inner.lock();
        f(&mut data)
    }

    /// Applies one wallet mutation as a single atomic unit.
    pub fn apply_transaction(
        &self,
        request: NewTransaction,
        now: DateTime<Utc>,
    ) -> Result<Transaction, LedgerError> {
        self.with_data(|data| data.apply(request, now))
    }
}

impl Serialize for Account {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let data = self.inner.lock();
        let mut state = serializer.serialize_struct("Account", 6)?;
        state.serialize_field("account", &data.id)?;
        state.serialize_field("balance", &data.balance.round_dp(Account::DECIMAL_PRECISION))?;
        state.serialize_field(
            "total_credited",
            &data.total_credited.round_dp(Account::DECIMAL_PRECISION),
        )?;
        state.serialize_field(
            "total_debited",
            &data.total_debited.round_dp(Account::DECIMAL_PRECISION),
        )?;
        state.serialize_field("transactions", &data.transactions.len())?;
        state.serialize_field("trial_consumed", &data.trial.consumed)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::purchase::PaymentMethod;
    use rust_decimal_macros::dec;

    fn data() -> AccountData {
        AccountData::new(AccountId(1), Category::from("powerball"), Utc::now())
    }

    fn credit(amount: Decimal) -> NewTransaction {
        NewTransaction::new(TransactionKind::Credit, amount, "top-up")
    }

    // === AccountData internal tests ===

    #[test]
    fn credit_increases_balance_and_totals() {
        let mut data = data();
        data.apply(credit(dec!(100.00)), Utc::now()).unwrap();
        assert_eq!(data.balance, dec!(100.00));
        assert_eq!(data.total_credited, dec!(100.00));
        assert_eq!(data.total_debited, Decimal::ZERO);
        assert!(data.last_transaction_at.is_some());
    }

    #[test]
    fn debit_decreases_balance() {
        let mut data = data();
        data.apply(credit(dec!(100.00)), Utc::now()).unwrap();
        data.apply(
            NewTransaction::new(TransactionKind::Debit, dec!(30.00), "adjustment"),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(data.balance, dec!(70.00));
        assert_eq!(data.total_debited, dec!(30.00));
    }

    #[test]
    fn overdraw_rejected_and_nothing_appended() {
        let mut data = data();
        data.apply(credit(dec!(10.00)), Utc::now()).unwrap();

        let result = data.apply(
            NewTransaction::new(TransactionKind::Payment, dec!(20.00), "unlock"),
            Utc::now(),
        );
        assert_eq!(result, Err(LedgerError::InsufficientBalance));
        assert_eq!(data.balance, dec!(10.00));
        assert_eq!(data.transactions.len(), 1);
    }

    #[test]
    fn zero_or_negative_amount_rejected() {
        let mut data = data();
        let zero = data.apply(credit(Decimal::ZERO), Utc::now());
        assert_eq!(zero, Err(LedgerError::InvalidAmount));
        let negative = data.apply(credit(dec!(-5.00)), Utc::now());
        assert_eq!(negative, Err(LedgerError::InvalidAmount));
        assert!(data.transactions.is_empty());
    }

    #[test]
    fn withdrawal_is_pending_but_decrements_immediately() {
        let mut data = data();
        data.apply(credit(dec!(50.00)), Utc::now()).unwrap();
        let tx = data
            .apply(
                NewTransaction::new(TransactionKind::Withdrawal, dec!(20.00), "payout"),
                Utc::now(),
            )
            .unwrap();
        assert_eq!(tx.status, TransactionStatus::Pending);
        assert_eq!(data.balance, dec!(30.00));
    }

    #[test]
    fn settle_withdrawal_completes_without_moving_funds() {
        let mut data = data();
        data.apply(credit(dec!(50.00)), Utc::now()).unwrap();
        let tx = data
            .apply(
                NewTransaction::new(TransactionKind::Withdrawal, dec!(20.00), "payout"),
                Utc::now(),
            )
            .unwrap();

        let settled = data.settle_withdrawal(tx.seq).unwrap();
        assert_eq!(settled.status, TransactionStatus::Completed);
        assert_eq!(data.balance, dec!(30.00));

        // Completed rows never transition again.
        assert_eq!(data.settle_withdrawal(tx.seq), Err(LedgerError::NotPending));
    }

    #[test]
    fn cancel_withdrawal_refunds_via_compensating_row() {
        let mut data = data();
        data.apply(credit(dec!(50.00)), Utc::now()).unwrap();
        let tx = data
            .apply(
                NewTransaction::new(TransactionKind::Withdrawal, dec!(20.00), "payout"),
                Utc::now(),
            )
            .unwrap();

        let refund = data.cancel_withdrawal(tx.seq, Utc::now()).unwrap();
        assert_eq!(refund.kind, TransactionKind::Refund);
        assert_eq!(refund.amount, dec!(20.00));
        assert_eq!(data.balance, dec!(50.00));
        assert_eq!(
            data.transactions[tx.seq as usize].status,
            TransactionStatus::Cancelled
        );
        // Signed sum over the log still matches the balance.
        data.assert_invariants();
    }

    #[test]
    fn settle_unknown_seq_fails() {
        let mut data = data();
        assert_eq!(data.settle_withdrawal(9), Err(LedgerError::TransactionNotFound));
    }

    #[test]
    fn settle_non_withdrawal_fails() {
        let mut data = data();
        let tx = data.apply(credit(dec!(10.00)), Utc::now()).unwrap();
        assert_eq!(data.settle_withdrawal(tx.seq), Err(LedgerError::NotPending));
    }

    #[test]
    fn purchase_guard_rejects_second_completed_record() {
        let mut data = data();
        let record = PurchaseRecord::completed(
            AccountId(1),
            ItemId(7),
            dec!(2.00),
            PaymentMethod::Ledger,
            "txn-1.0".to_string(),
            Utc::now(),
        );
        data.insert_completed_purchase(record.clone()).unwrap();
        assert_eq!(
            data.insert_completed_purchase(record),
            Err(LedgerError::AlreadyPurchased)
        );
    }

    // === Serialization tests ===

    #[test]
    fn serializer_rounds_to_two_decimal_places() {
        let account = Account::new(AccountId(1), Category::from("powerball"), Utc::now());
        account
            .apply_transaction(credit(dec!(123.456)), Utc::now())
            .unwrap();

        let json = serde_json::to_string(&account).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed["account"], 1);
        assert_eq!(parsed["balance"].as_str().unwrap(), "123.46");
        assert_eq!(parsed["total_credited"].as_str().unwrap(), "123.46");
        assert_eq!(parsed["total_debited"].as_str().unwrap(), "0");
        assert_eq!(parsed["transactions"], 1);
        assert_eq!(parsed["trial_consumed"], false);
    }

    #[test]
    fn serializer_preserves_precision_up_to_two_decimals() {
        let account = Account::new(AccountId(42), Category::from("mega"), Utc::now());
        account
            .apply_transaction(credit(dec!(100.12)), Utc::now())
            .unwrap();

        let json = serde_json::to_string(&account).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["account"], 42);
        assert_eq!(parsed["balance"].as_str().unwrap(), "100.12");
    }
}
