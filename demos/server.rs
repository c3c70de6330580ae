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

//! Simple REST API server example for the wallet engine.
//!
//! Run with: `cargo run --example server`
//!
//! ## Endpoints
//!
//! - `POST /accounts` - Register an account (fixes the trial window)
//! - `POST /transactions` - Apply a wallet mutation (credit, debit, bonus, refund, withdrawal)
//! - `POST /access` - Request access to a catalog item (view or purchase)
//! - `GET /accounts` - List account statements
//! - `GET /accounts/:id` - Get one account statement
//!
//! ## Example Usage
//!
//! ```bash
//! # Register
//! curl -X POST http://localhost:3000/accounts \
//!   -H "Content-Type: application/json" \
//!   -d '{"account_id": 1, "category": "powerball"}'
//!
//! # Credit the wallet
//! curl -X POST http://localhost:3000/transactions \
//!   -H "Content-Type: application/json" \
//!   -d '{"kind": "credit", "account_id": 1, "amount": "5.00", "description": "top-up"}'
//!
//! # Buy a prediction from the wallet
//! curl -X POST http://localhost:3000/access \
//!   -H "Content-Type: application/json" \
//!   -d '{"account_id": 1, "item_id": 42, "price": "2.00", "category": "mega", "method": "ledger"}'
//!
//! # Get statement
//! curl http://localhost:3000/accounts/1
//! ```

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tipvault::{
    AccessResult, AccountId, CatalogItem, Category, Engine, ItemId, LedgerError, NewTransaction,
    PaymentMethod, TransactionKind,
};
use tokio::net::TcpListener;

// === Request/Response DTOs ===

/// Request body for registering an account.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub account_id: u64,
    pub category: String,
}

/// Request body for wallet mutations.
///
/// ```json
/// {"kind": "credit", "account_id": 1, "amount": "5.00", "description": "top-up"}
/// ```
#[derive(Debug, Deserialize)]
pub struct TransactionRequest {
    pub kind: TransactionKind,
    pub account_id: u64,
    pub amount: Decimal,
    pub description: String,
    pub reference: Option<String>,
}

/// Request body for access/purchase decisions.
#[derive(Debug, Deserialize)]
pub struct AccessRequest {
    pub account_id: u64,
    pub item_id: u64,
    pub price: Decimal,
    pub category: String,
    /// `"ledger"`, `"gateway"`, or absent for a plain view.
    pub method: Option<String>,
}

/// Response body for account statements.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub account: u64,
    pub balance: Decimal,
    pub total_credited: Decimal,
    pub total_debited: Decimal,
    pub transactions: usize,
    pub trial_consumed: bool,
}

/// Response body for errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

// === Application State ===

/// Shared application state containing the wallet engine.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

// === Error Handling ===

/// Wrapper for converting `LedgerError` into HTTP responses.
pub struct AppError(LedgerError);

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            LedgerError::InvalidAmount => (StatusCode::BAD_REQUEST, "INVALID_AMOUNT"),
            LedgerError::InsufficientBalance => {
                (StatusCode::UNPROCESSABLE_ENTITY, "INSUFFICIENT_BALANCE")
            }
            LedgerError::AlreadyPurchased => (StatusCode::CONFLICT, "ALREADY_PURCHASED"),
            LedgerError::RedundantDuringTrial => {
                (StatusCode::UNPROCESSABLE_ENTITY, "REDUNDANT_DURING_TRIAL")
            }
            LedgerError::ItemUnavailable => (StatusCode::NOT_FOUND, "ITEM_UNAVAILABLE"),
            LedgerError::AccountNotFound => (StatusCode::NOT_FOUND, "ACCOUNT_NOT_FOUND"),
            LedgerError::AccountExists => (StatusCode::CONFLICT, "ACCOUNT_EXISTS"),
            LedgerError::TransactionNotFound => (StatusCode::NOT_FOUND, "TRANSACTION_NOT_FOUND"),
            LedgerError::NotPending => (StatusCode::CONFLICT, "NOT_PENDING"),
            LedgerError::DuplicateReference => (StatusCode::CONFLICT, "DUPLICATE_REFERENCE"),
            LedgerError::ConcurrencyConflict => (StatusCode::CONFLICT, "CONCURRENCY_CONFLICT"),
            LedgerError::StoreUnavailable => {
                (StatusCode::SERVICE_UNAVAILABLE, "STORE_UNAVAILABLE")
            }
        };

        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
                code: code.to_string(),
            }),
        )
            .into_response()
    }
}

// === Handlers ===

/// POST /accounts - Register a new account.
async fn register_account(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<StatusCode, AppError> {
    state.engine.register_account(
        AccountId(request.account_id),
        Category::new(request.category),
        Utc::now(),
    )?;
    Ok(StatusCode::CREATED)
}

/// POST /transactions - Apply a wallet mutation.
async fn create_transaction(
    State(state): State<AppState>,
    Json(request): Json<TransactionRequest>,
) -> Result<StatusCode, AppError> {
    let mut tx = NewTransaction::new(request.kind, request.amount, request.description);
    if let Some(reference) = request.reference {
        tx = tx.with_reference(reference);
    }
    state
        .engine
        .apply_transaction(AccountId(request.account_id), tx, Utc::now())?;
    Ok(StatusCode::CREATED)
}

/// POST /access - Resolve access to a catalog item.
async fn request_access(
    State(state): State<AppState>,
    Json(request): Json<AccessRequest>,
) -> Result<Json<AccessResult>, AppError> {
    let method = match request.method.as_deref() {
        Some("ledger") => Some(PaymentMethod::Ledger),
        Some("gateway") => Some(PaymentMethod::ExternalGateway),
        _ => None,
    };
    let item = CatalogItem {
        id: ItemId(request.item_id),
        price: request.price,
        category: Category::new(request.category),
        is_active: true,
    };
    let result =
        state
            .engine
            .request_access(AccountId(request.account_id), &item, method, Utc::now())?;
    Ok(Json(result))
}

fn account_response(account: &tipvault::Account) -> AccountResponse {
    AccountResponse {
        account: account.id().0,
        balance: account.balance(),
        total_credited: account.total_credited(),
        total_debited: account.total_debited(),
        transactions: account.transaction_count(),
        trial_consumed: account.trial().consumed,
    }
}

/// GET /accounts/:id - Get account statement by ID.
async fn get_account(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<AccountResponse>, (StatusCode, Json<ErrorResponse>)> {
    state
        .engine
        .get_account(&AccountId(id))
        .map(|account| Json(account_response(&account)))
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: "Account not found".to_string(),
                    code: "ACCOUNT_NOT_FOUND".to_string(),
                }),
            )
        })
}

/// GET /accounts - List all account statements.
async fn list_accounts(State(state): State<AppState>) -> Json<Vec<AccountResponse>> {
    let accounts: Vec<AccountResponse> = state
        .engine
        .accounts()
        .map(|ref_multi| account_response(ref_multi.value()))
        .collect();

    Json(accounts)
}

// === Router ===

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/accounts", post(register_account).get(list_accounts))
        .route("/transactions", post(create_transaction))
        .route("/access", post(request_access))
        .route("/accounts/{id}", get(get_account))
        .with_state(state)
}

// === Main ===

#[tokio::main]
async fn main() {
    let state = AppState {
        engine: Arc::new(Engine::new()),
    };

    let app = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:3000").await.unwrap();
    println!("Tipvault API server running on http://127.0.0.1:3000");
    println!();
    println!("Endpoints:");
    println!("  POST /accounts      - Register an account");
    println!("  POST /transactions  - Apply a wallet mutation");
    println!("  POST /access        - Request access to an item");
    println!("  GET  /accounts      - List account statements");
    println!("  GET  /accounts/:id  - Get statement by account ID");

    axum::serve(listener, app).await.unwrap();
}
