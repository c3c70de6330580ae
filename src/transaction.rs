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

//! Wallet transactions.
//!
//! A [`Transaction`] is one signed monetary movement against an account
//! balance. Inflows are `Credit`, `Refund`, `Bonus`; outflows are `Debit`,
//! `Withdrawal`, `Payment`. Rows are append-only: a `Completed` transaction
//! is never mutated or removed, only `Pending` withdrawals may transition
//! (to `Completed` on settlement, or `Cancelled` with a compensating refund).

use crate::base::{AccountId, ItemId, TransactionRef};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The six monetary movement kinds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Credit,
    Debit,
    Refund,
    Payment,
    Bonus,
    Withdrawal,
}

impl TransactionKind {
    /// Whether the kind increases the balance.
    pub fn is_inflow(self) -> bool {
        matches!(self, Self::Credit | Self::Refund | Self::Bonus)
    }

    /// Status a freshly appended transaction of this kind starts in.
    ///
    /// Withdrawals start `Pending` (manual settlement happens later) but
    /// still decrement the balance immediately: the funds are committed even
    /// though unsettled. Everything else commits as `Completed`.
    pub fn initial_status(self) -> TransactionStatus {
        match self {
            Self::Withdrawal => TransactionStatus::Pending,
            _ => TransactionStatus::Completed,
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
            Self::Refund => "refund",
            Self::Payment => "payment",
            Self::Bonus => "bonus",
            Self::Withdrawal => "withdrawal",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

/// Closed, schema-checked payload attached to a transaction.
///
/// Replaces the open key/value metadata bag of loosely-typed designs: each
/// variant is checked at compile time instead of guarded at runtime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "detail", rename_all = "snake_case")]
pub enum TransactionDetail {
    /// No structured payload.
    Plain,
    /// Payment unlocking one catalog item.
    ItemPurchase { item_id: ItemId },
    /// Refund compensating a cancelled pending withdrawal.
    WithdrawalReversal { original_seq: u64 },
}

/// One committed row in an account's append-only transaction log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    /// Position in the account log at append time; chronological order.
    pub seq: u64,
    pub kind: TransactionKind,
    /// Strictly positive; the sign comes from the kind.
    pub amount: Decimal,
    pub status: TransactionStatus,
    pub description: String,
    /// Caller-supplied free-form reference, e.g. `item:42`.
    pub reference: Option<String>,
    pub detail: TransactionDetail,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Amount with the sign implied by the kind.
    pub fn signed_amount(&self) -> Decimal {
        if self.kind.is_inflow() {
            self.amount
        } else {
            -self.amount
        }
    }

    /// Globally unique audit reference for this transaction.
    pub fn audit_ref(&self, account_id: AccountId) -> TransactionRef {
        TransactionRef {
            account_id,
            seq: self.seq,
        }
    }
}

/// Input for one wallet mutation, before the ledger assigns `seq`, status,
/// and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub description: String,
    pub reference: Option<String>,
    pub detail: TransactionDetail,
}

impl NewTransaction {
    pub fn new(kind: TransactionKind, amount: Decimal, description: impl Into<String>) -> Self {
        Self {
            kind,
            amount,
            description: description.into(),
            reference: None,
            detail: TransactionDetail::Plain,
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_detail(mut self, detail: TransactionDetail) -> Self {
        self.detail = detail;
        self
    }
}
