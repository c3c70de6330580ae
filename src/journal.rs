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

//! Global audit trail with reference deduplication.
//!
//! Every committed monetary movement lands here after its account-level
//! commit, preserving cross-account commit order for audit export. The
//! journal doubles as a backstop for reference uniqueness: a settlement
//! reference can only ever be recorded once.

use crate::base::AccountId;
use crate::error::LedgerError;
use crate::transaction::TransactionKind;
use chrono::{DateTime, Utc};
use crossbeam::queue::SegQueue;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::Serialize;

/// One exported audit line.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AuditEntry {
    /// Settlement reference; unique across the whole journal.
    pub reference: String,
    pub account_id: AccountId,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub recorded_at: DateTime<Utc>,
}

/// A thread-safe audit trail with duplicate detection.
///
/// Combines a [`DashMap`] for O(1) duplicate checking with a [`SegQueue`]
/// that buffers references lock-free on the commit path. Export moves the
/// buffered references into an ordered list; the trail itself is append-only
/// and nothing removes an entry once recorded.
#[derive(Debug, Default)]
pub struct AuditJournal {
    /// Entries keyed by reference for O(1) duplicate detection.
    entries: DashMap<String, AuditEntry>,

    /// References not yet materialized into `ordered`, in FIFO commit order.
    incoming: SegQueue<String>,

    /// References already materialized, in commit order.
    ordered: Mutex<Vec<String>>,
}

impl AuditJournal {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            incoming: SegQueue::new(),
            ordered: Mutex::new(Vec::new()),
        }
    }

    /// Records one committed entry.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::DuplicateReference`] if the reference was
    /// already recorded. The entry API makes check-and-insert atomic.
    pub fn push(&self, entry: AuditEntry) -> Result<(), LedgerError> {
        match self.entries.entry(entry.reference.clone()) {
            Entry::Occupied(_) => Err(LedgerError::DuplicateReference),
            Entry::Vacant(vacant) => {
                self.incoming.push(entry.reference.clone());
                vacant.insert(entry);
                Ok(())
            }
        }
    }

    /// Snapshots the full trail in commit order, leaving it intact.
    pub fn export(&self) -> Vec<AuditEntry> {
        let mut ordered = self.ordered.lock();
        while let Some(reference) = self.incoming.pop() {
            ordered.push(reference);
        }
        ordered
            .iter()
            .filter_map(|reference| self.entries.get(reference).map(|e| e.clone()))
            .collect()
    }

    /// Looks up an entry by its reference.
    pub fn get(&self, reference: &str) -> Option<AuditEntry> {
        self.entries.get(reference).map(|e| e.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
