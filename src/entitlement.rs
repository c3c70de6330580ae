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

//! Entitlement decision: may this account access this item, and how.
//!
//! The decision runs entirely inside one account lock, so the ownership
//! check, the trial-day bookkeeping, the balance debit, and the purchase
//! record insert are a single atomic unit. Concurrent double-submits of the
//! same purchase therefore resolve deterministically: one buyer, one
//! `payment` row, one completed record; the loser sees `AlreadyPurchased`
//! and is never charged.
//!
//! Evaluation order is fixed:
//! 1. owned: view granted (view) / re-buy rejected (buy)
//! 2. catalog availability
//! 3. free trial slot (view) / redundant-purchase rejection (buy)
//! 4. trial exhausted today (view) or fall through to purchase (buy)
//! 5. ledger debit + record, or gateway payment intent

use crate::account::AccountData;
use crate::base::{Category, ItemId};
use crate::error::LedgerError;
use crate::purchase::{PaymentMethod, PurchaseRecord};
use crate::transaction::{NewTransaction, TransactionDetail, TransactionKind};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Authoritative call-time snapshot of one catalog item, supplied by the
/// catalog collaborator. Price and category are not revalidated here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: ItemId,
    pub price: Decimal,
    pub category: Category,
    pub is_active: bool,
}

/// Resolved answer to an access request. Every variant is a normal result;
/// rejections travel as [`LedgerError`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AccessResult {
    /// A completed purchase already exists; repeat views are idempotent.
    /// (A repeat *purchase* of an owned item is the `AlreadyPurchased`
    /// error, not this.)
    Owned,
    /// Granted via the trial; today's free slot is now consumed.
    FreeAccess,
    /// Trial would apply but today's free slot is gone. Empty result,
    /// not an error.
    TrialExhaustedToday,
    /// No entitlement applies and no payment method was offered; the caller
    /// may retry with one.
    PurchaseRequired { price: Decimal },
    /// Paid from the wallet; `reference` is the payment transaction's
    /// audit ref.
    Purchased { reference: String },
    /// Deferred to the external gateway; settlement arrives through
    /// [`Engine::settle_gateway_purchase`].
    ///
    /// [`Engine::settle_gateway_purchase`]: crate::Engine::settle_gateway_purchase
    PaymentIntent { amount: Decimal, item_id: ItemId },
}

/// Runs the ordered access decision against locked account data.
pub(crate) fn resolve_access(
    data: &mut AccountData,
    item: &CatalogItem,
    method: Option<PaymentMethod>,
    now: DateTime<Utc>,
) -> Result<AccessResult, LedgerError> {
    // 1. Already owned. A plain view is granted with view bookkeeping; an
    // explicit purchase attempt is refused so the caller learns it would
    // have paid twice. This is also what the loser of a concurrent
    // double-submit sees: by the time it re-enters the lock the winner's
    // record exists, and it was never charged.
    if data.completed_purchase(item.id).is_some() {
        if method.is_some() {
            return Err(LedgerError::AlreadyPurchased);
        }
        if let Some(record) = data.purchases.get_mut(&item.id) {
            record.record_view(now);
        }
        return Ok(AccessResult::Owned);
    }

    // 2. Catalog gate.
    if !item.is_active {
        return Err(LedgerError::ItemUnavailable);
    }

    // 3. Trial slot. A view takes it; an explicit purchase of an item that
    // is free today is refused rather than double-charged.
    if data.trial.has_free_access_today(&item.category, now) {
        if method.is_some() {
            return Err(LedgerError::RedundantDuringTrial);
        }
        data.trial.record_free_access(now);
        return Ok(AccessResult::FreeAccess);
    }

    // 4. Same category, trial still active, slot used today: a plain view
    // gets the empty result; a purchase falls through.
    let Some(method) = method else {
        if data.trial.is_active(now) && item.category == data.trial.selected_category {
            return Ok(AccessResult::TrialExhaustedToday);
        }
        return Ok(AccessResult::PurchaseRequired { price: item.price });
    };

    // 5. Purchase.
    match method {
        PaymentMethod::Ledger => {
            // Check-before-charge: the uniqueness check already passed in
            // step 1 and we still hold the lock, so verify funds and debit.
            if data.balance < item.price {
                return Err(LedgerError::InsufficientBalance);
            }

            let request = NewTransaction::new(
                TransactionKind::Payment,
                item.price,
                format!("purchase of item {}", item.id),
            )
            .with_reference(format!("item:{}", item.id))
            .with_detail(TransactionDetail::ItemPurchase { item_id: item.id });

            let transaction = data.apply(request, now)?;
            let reference = transaction.audit_ref(data.id).to_string();

            let record = PurchaseRecord::completed(
                data.id,
                item.id,
                item.price,
                PaymentMethod::Ledger,
                reference.clone(),
                now,
            );
            data.insert_completed_purchase(record)?;

            Ok(AccessResult::Purchased { reference })
        }
        PaymentMethod::ExternalGateway => {
            // No ledger mutation; the record is only created once the
            // gateway reports success.
            Ok(AccessResult::PaymentIntent {
                amount: item.price,
                item_id: item.id,
            })
        }
    }
}

/// Applies the gateway's settlement report for a deferred purchase.
///
/// On success a completed record is created (the uniqueness guard still
/// applies); on failure nothing is persisted.
pub(crate) fn settle_gateway(
    data: &mut AccountData,
    item_id: ItemId,
    amount: Decimal,
    gateway_ref: &str,
    success: bool,
    now: DateTime<Utc>,
) -> Result<Option<PurchaseRecord>, LedgerError> {
    if !success {
        return Ok(None);
    }

    let record = PurchaseRecord::completed(
        data.id,
        item_id,
        amount,
        PaymentMethod::ExternalGateway,
        format!("gw-{gateway_ref}"),
        now,
    );
    data.insert_completed_purchase(record.clone())?;
    Ok(Some(record))
}
