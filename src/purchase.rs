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

//! Purchase records linking an account to an unlocked catalog item.

use crate::base::{AccountId, ItemId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How a purchase was (or will be) settled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Paid from the wallet balance.
    Ledger,
    /// Settled by the external payment gateway.
    ExternalGateway,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

/// The record of one account's access grant to one catalog item.
///
/// At most one `Completed` record may exist per (account, item) pair; the
/// check is enforced inside the account's atomic unit before any charge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PurchaseRecord {
    pub account_id: AccountId,
    pub item_id: ItemId,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    /// Unique settlement reference: the ledger transaction's audit ref, or
    /// the gateway's settlement reference.
    pub transaction_ref: String,
    pub purchased_at: DateTime<Utc>,
    pub view_count: u64,
    pub last_viewed_at: Option<DateTime<Utc>>,
}

impl PurchaseRecord {
    /// A record settled at creation time (ledger debit already committed, or
    /// gateway success already reported).
    pub fn completed(
        account_id: AccountId,
        item_id: ItemId,
        amount: Decimal,
        method: PaymentMethod,
        transaction_ref: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            account_id,
            item_id,
            amount,
            method,
            status: PaymentStatus::Completed,
            transaction_ref,
            purchased_at: now,
            view_count: 0,
            last_viewed_at: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == PaymentStatus::Completed
    }

    pub fn record_view(&mut self, now: DateTime<Utc>) {
        self.view_count += 1;
        self.last_viewed_at = Some(now);
    }
}
