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

//! Durable keyed storage for accounts.
//!
//! One [`Account`] per user, indexed by [`AccountId`] in a [`DashMap`]. The
//! store exposes atomic per-account read-modify-write through
//! [`LedgerStore::with_account`]; accounts are the only shared mutable
//! resource, and operations on different accounts proceed fully in parallel.

use crate::account::{Account, AccountData};
use crate::base::{AccountId, Category};
use crate::error::LedgerError;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Bounded retry budget for transient store failures. Terminal errors are
/// surfaced on the first attempt.
const MAX_TRANSIENT_ATTEMPTS: usize = 3;

/// Keyed account storage with per-account atomicity.
#[derive(Debug, Default)]
pub struct LedgerStore {
    accounts: DashMap<AccountId, Account>,
}

impl LedgerStore {
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
        }
    }

    /// Registers a new zero-balance account; the trial window is fixed at
    /// this moment.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::AccountExists`] if the ID is already taken.
    /// The entry API makes the check-and-insert atomic.
    pub fn create(
        &self,
        id: AccountId,
        selected_category: Category,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        match self.accounts.entry(id) {
            Entry::Occupied(_) => Err(LedgerError::AccountExists),
            Entry::Vacant(entry) => {
                entry.insert(Account::new(id, selected_category, now));
                Ok(())
            }
        }
    }

    /// Runs `f` against the account's data under its mutex: the atomic
    /// read-modify-write every wallet and entitlement operation uses.
    pub(crate) fn with_account<R>(
        &self,
        id: AccountId,
        f: impl FnOnce(&mut AccountData) -> Result<R, LedgerError>,
    ) -> Result<R, LedgerError> {
        let account = self.accounts.get(&id).ok_or(LedgerError::AccountNotFound)?;
        account.with_data(f)
    }

    /// Retrieves an account by ID for read-only snapshots.
    pub fn get(&self, id: &AccountId) -> Option<dashmap::mapref::one::Ref<'_, AccountId, Account>> {
        self.accounts.get(id)
    }

    /// Iterates over all accounts, e.g. for statement reports.
    pub fn iter(
        &self,
    ) -> impl Iterator<Item = dashmap::mapref::multiple::RefMulti<'_, AccountId, Account>> {
        self.accounts.iter()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

/// Retries `f` on transient errors (`ConcurrencyConflict`,
/// `StoreUnavailable`) up to the bounded budget, at this boundary only.
///
/// Terminal results pass through on the first attempt; callers never
/// re-enter the purchase decision itself, so trial-day state is evaluated
/// exactly once per request.
pub(crate) fn run_retrying<R>(
    mut f: impl FnMut() -> Result<R, LedgerError>,
) -> Result<R, LedgerError> {
    let mut attempt = 1;
    loop {
        match f() {
            Err(err) if err.is_transient() && attempt < MAX_TRANSIENT_ATTEMPTS => {
                tracing::debug!(attempt, error = %err, "retrying transient store failure");
                attempt += 1;
            }
            result => return result,
        }
    }
}
