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

//! Fire-and-forget notification boundary.
//!
//! The engine reports events here after the account lock is released and
//! the commit is final. The trait returns nothing: a failing dispatcher can
//! never roll back a ledger mutation.

use crate::base::{AccountId, ItemId};
use rust_decimal::Decimal;

/// Post-commit ledger events.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerEvent {
    BalanceChanged {
        account_id: AccountId,
        balance: Decimal,
    },
    PurchaseCompleted {
        account_id: AccountId,
        item_id: ItemId,
        amount: Decimal,
    },
    TrialConsumed {
        account_id: AccountId,
    },
}

/// External notification dispatcher (email/SMS/push lives behind this).
pub trait Notifier: Send + Sync {
    fn notify(&self, event: &LedgerEvent);
}

/// Dispatcher that drops every event; the engine default.
#[derive(Debug, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _event: &LedgerEvent) {}
}
