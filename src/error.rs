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

//! Error types for ledger and entitlement processing.

use thiserror::Error;

/// Ledger and entitlement processing errors.
///
/// Every rejection is a typed variant so callers can render a specific
/// message without inspecting free text. "No free access left today" is NOT
/// an error; it is the [`AccessResult::TrialExhaustedToday`] result.
///
/// [`AccessResult::TrialExhaustedToday`]: crate::AccessResult::TrialExhaustedToday
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Amount is zero or negative
    #[error("invalid amount (must be positive)")]
    InvalidAmount,

    /// An outflow would take the balance below zero
    #[error("insufficient wallet balance")]
    InsufficientBalance,

    /// A completed purchase of this item already exists for the account
    #[error("item already purchased by this account")]
    AlreadyPurchased,

    /// The item is obtainable free today via the trial; paying for it is refused
    #[error("item is available free during the active trial")]
    RedundantDuringTrial,

    /// Catalog reports the item inactive or missing
    #[error("item is unavailable")]
    ItemUnavailable,

    /// No account registered under this ID
    #[error("account not found")]
    AccountNotFound,

    /// An account is already registered under this ID
    #[error("account already exists")]
    AccountExists,

    /// Referenced transaction sequence does not exist in the account log
    #[error("transaction not found")]
    TransactionNotFound,

    /// Settlement attempted on a transaction that is not pending
    #[error("transaction is not pending")]
    NotPending,

    /// An audit reference was recorded twice
    #[error("duplicate transaction reference")]
    DuplicateReference,

    /// Optimistic-concurrency conflict; safe to retry the same intent
    #[error("concurrent modification conflict")]
    ConcurrencyConflict,

    /// The ledger store is temporarily unreachable; safe to retry with backoff
    #[error("ledger store unavailable")]
    StoreUnavailable,
}

impl LedgerError {
    /// Whether the error is transient and may be retried a bounded number of
    /// times at the store boundary. All other variants are terminal for the
    /// current request and must be surfaced verbatim.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LedgerError::ConcurrencyConflict | LedgerError::StoreUnavailable
        )
    }
}
