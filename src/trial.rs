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

//! Trial window policy.
//!
//! Pure functions over an account's [`TrialState`] and a caller-supplied
//! "now". The window is fixed at registration (7 days); during it the
//! account may view one item of its selected category per UTC calendar day
//! for free. Expiry is observed lazily on access, never by a timer.

use crate::base::Category;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Length of the free trial window.
pub const TRIAL_DAYS: i64 = 7;

/// Per-account trial bookkeeping, embedded in the account record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrialState {
    pub started_at: DateTime<Utc>,
    /// `started_at + 7 days`, fixed at registration.
    pub ends_at: DateTime<Utc>,
    pub selected_category: Category,
    /// Set exactly once, after the window has closed and the account has
    /// been observed at least once post-expiry.
    pub consumed: bool,
    /// UTC calendar date of the last free item viewed.
    pub last_access_date: Option<NaiveDate>,
}

impl TrialState {
    pub fn new(started_at: DateTime<Utc>, selected_category: Category) -> Self {
        Self {
            started_at,
            ends_at: started_at + Duration::days(TRIAL_DAYS),
            selected_category,
            consumed: false,
            last_access_date: None,
        }
    }

    /// The window is still open at `now`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now <= self.ends_at
    }

    /// The lifetime trial entitlement has not been used up yet.
    pub fn can_start(&self) -> bool {
        !self.consumed
    }

    /// Lazily flips `consumed` once the window has closed.
    ///
    /// Returns `true` only on the single call that performs the transition;
    /// every later call is a no-op.
    pub fn mark_consumed_if_expired(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_active(now) && !self.consumed {
            self.consumed = true;
            return true;
        }
        false
    }

    /// Whether an item of `category` is viewable for free right now.
    ///
    /// True iff the window is active, the category matches the one selected
    /// at registration, and no free item has been viewed on `now`'s UTC
    /// calendar day yet.
    pub fn has_free_access_today(&self, category: &Category, now: DateTime<Utc>) -> bool {
        if !self.is_active(now) || category != &self.selected_category {
            return false;
        }
        match self.last_access_date {
            None => true,
            Some(last) => last < now.date_naive(),
        }
    }

    /// Consumes today's free slot.
    pub fn record_free_access(&mut self, now: DateTime<Utc>) {
        self.last_access_date = Some(now.date_naive());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn trial() -> TrialState {
        TrialState::new(start(), Category::from("powerball"))
    }

    #[test]
    fn window_spans_seven_days() {
        let t = trial();
        assert_eq!(t.ends_at - t.started_at, Duration::days(7));
        assert!(t.is_active(start() + Duration::days(7)));
        assert!(!t.is_active(start() + Duration::days(7) + Duration::seconds(1)));
    }

    #[test]
    fn free_access_requires_matching_category() {
        let t = trial();
        let day1 = start() + Duration::days(1);
        assert!(t.has_free_access_today(&Category::from("powerball"), day1));
        assert!(!t.has_free_access_today(&Category::from("mega"), day1));
    }

    #[test]
    fn one_free_item_per_calendar_day() {
        let mut t = trial();
        let day1 = start() + Duration::days(1);
        assert!(t.has_free_access_today(&Category::from("powerball"), day1));

        t.record_free_access(day1);
        assert!(!t.has_free_access_today(&Category::from("powerball"), day1));

        // Later the same UTC day: still exhausted.
        let later = day1 + Duration::hours(5);
        assert!(!t.has_free_access_today(&Category::from("powerball"), later));

        // Next UTC day: slot is back.
        let next_day = day1 + Duration::days(1);
        assert!(t.has_free_access_today(&Category::from("powerball"), next_day));
    }

    #[test]
    fn no_free_access_after_expiry() {
        let t = trial();
        let after = start() + Duration::days(8);
        assert!(!t.has_free_access_today(&Category::from("powerball"), after));
    }

    #[test]
    fn consumed_flag_flips_once_after_expiry() {
        let mut t = trial();
        let during = start() + Duration::days(3);
        let after = start() + Duration::days(8);

        assert!(!t.mark_consumed_if_expired(during));
        assert!(!t.consumed);
        assert!(t.can_start());

        assert!(t.mark_consumed_if_expired(after));
        assert!(t.consumed);
        assert!(!t.can_start());

        // Idempotent: repeating the call is a no-op.
        assert!(!t.mark_consumed_if_expired(after));
        assert!(t.consumed);
    }
}
