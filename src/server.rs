// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
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

//! REST API in front of the [`Ledger`].
//!
//! ## Endpoints
//!
//! - `GET  /api/balance/{id}` - Balance and exchanged amount of one user
//! - `POST /api/add` - Credit tokens: `{"id", "amount", "games"?}`
//! - `POST /api/subtract` - Debit or redeem tokens: `{"id", "amount", "games"?}`
//! - `GET  /api/history` - All transactions, newest first
//! - `GET  /api/ranking` - Users by balance, highest first
//! - `POST /api/users` - Register a user: `{"id"?, "balance"?}`
//! - `GET  /api/dashboard-stats` - User count, token supply, transaction count
//!
//! When a front-end directory is configured, `/` redirects to `/dealer`, the
//! `/dealer` and `/user` pages are served from `pages/`, and everything else
//! falls back to static files.
//!
//! ## Example Usage
//!
//! ```bash
//! curl -X POST http://localhost:3000/api/users \
//!   -H "Content-Type: application/json" -d '{"balance": 100}'
//!
//! curl -X POST http://localhost:3000/api/subtract \
//!   -H "Content-Type: application/json" \
//!   -d '{"id": "CC-2025-K3Q9ZP", "amount": 50, "games": "roulette"}'
//! ```

use crate::amount::parse_number;
use crate::{
    BalanceSnapshot, DashboardStats, HistoryEntry, Ledger, LedgerError, Operation, RankingEntry,
    TransactionRequest, User, UserId,
};
use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path as FsPath;
use std::sync::Arc;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::set_header::SetResponseHeader;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

// === Request/Response DTOs ===

/// Body of `/api/add` and `/api/subtract`.
///
/// `amount` is kept as raw JSON so that numeric strings typed into the
/// dealer form are accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionBody {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub amount: Value,
    #[serde(default)]
    pub games: Option<String>,
}

/// Body of `/api/users`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateUserBody {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub balance: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub success: bool,
    pub balance: i64,
    pub exchanged_amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserResponse {
    pub success: bool,
    pub user: User,
}

/// Response body for errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

// === Application State ===

/// Shared application state containing the ledger.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Ledger>,
}

impl AppState {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            ledger: Arc::new(ledger),
        }
    }
}

// === Error Handling ===

/// Wrapper for converting `LedgerError` into HTTP responses.
#[derive(Debug)]
pub struct AppError(LedgerError);

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        AppError(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError(LedgerError::InvalidArgument(rejection.body_text()))
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            LedgerError::InvalidArgument(_)
            | LedgerError::InsufficientFunds
            | LedgerError::LimitExceeded { .. } => StatusCode::BAD_REQUEST,
            LedgerError::NotFound => StatusCode::NOT_FOUND,
            LedgerError::Conflict(_) => StatusCode::CONFLICT,
            LedgerError::IdSpaceExhausted { .. } | LedgerError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if self.0.is_internal() {
            error!(error = %self.0, "Request failed");
        } else {
            debug!(code = self.0.code(), error = %self.0, "Request rejected");
        }

        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
                code: self.0.code().to_string(),
            }),
        )
            .into_response()
    }
}

// === Handlers ===

/// GET /api/balance/{id}
async fn get_balance(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BalanceSnapshot>, AppError> {
    Ok(Json(state.ledger.balance(&UserId::new(id))?))
}

/// POST /api/add
async fn add(
    State(state): State<AppState>,
    body: Result<Json<TransactionBody>, JsonRejection>,
) -> Result<Json<TransactionResponse>, AppError> {
    transact(&state, Operation::Add, body?.0)
}

/// POST /api/subtract
async fn subtract(
    State(state): State<AppState>,
    body: Result<Json<TransactionBody>, JsonRejection>,
) -> Result<Json<TransactionResponse>, AppError> {
    transact(&state, Operation::Subtract, body?.0)
}

fn transact(
    state: &AppState,
    operation: Operation,
    body: TransactionBody,
) -> Result<Json<TransactionResponse>, AppError> {
    let id = body
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| LedgerError::InvalidArgument("missing id".into()))?;
    let amount = parse_number(&body.amount)
        .ok_or_else(|| LedgerError::InvalidArgument("amount must be a number".into()))?;

    let request = TransactionRequest {
        user_id: UserId::new(id),
        operation,
        amount,
        category: body.games,
    };
    let snapshot = state.ledger.apply(&request)?;

    Ok(Json(TransactionResponse {
        success: true,
        balance: snapshot.balance,
        exchanged_amount: snapshot.exchanged_amount,
    }))
}

/// GET /api/history
async fn history(State(state): State<AppState>) -> Result<Json<Vec<HistoryEntry>>, AppError> {
    Ok(Json(state.ledger.history()?))
}

/// GET /api/ranking
async fn ranking(State(state): State<AppState>) -> Result<Json<Vec<RankingEntry>>, AppError> {
    Ok(Json(state.ledger.ranking()?))
}

/// POST /api/users
async fn create_user(
    State(state): State<AppState>,
    body: Result<Json<CreateUserBody>, JsonRejection>,
) -> Result<Json<CreateUserResponse>, AppError> {
    let body = body?.0;
    // Unparseable balances open the account at zero rather than failing.
    let balance = parse_number(&body.balance);
    let user = state.ledger.create_user(body.id.as_deref(), balance)?;
    Ok(Json(CreateUserResponse {
        success: true,
        user,
    }))
}

/// GET /api/dashboard-stats
async fn dashboard_stats(State(state): State<AppState>) -> Result<Json<DashboardStats>, AppError> {
    Ok(Json(state.ledger.dashboard_stats()?))
}

// === Router ===

/// JSON API routes, without the `/api` prefix.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/balance/{id}", get(get_balance))
        .route("/add", post(add))
        .route("/subtract", post(subtract))
        .route("/history", get(history))
        .route("/ranking", get(ranking))
        .route("/users", post(create_user))
        .route("/dashboard-stats", get(dashboard_stats))
        .with_state(state)
}

/// Full application: the API under `/api`, plus the operator front-end when
/// `static_dir` is given.
pub fn router(state: AppState, static_dir: Option<&FsPath>) -> Router {
    let mut app = Router::new().nest("/api", api_router(state));

    if let Some(dir) = static_dir {
        let pages = dir.join("pages");
        let service_worker = SetResponseHeader::overriding(
            ServeFile::new(dir.join("js").join("service-worker.js")),
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store, no-cache, must-revalidate, proxy-revalidate"),
        );
        app = app
            .route("/", get(|| async { Redirect::to("/dealer") }))
            .route_service("/dealer", ServeFile::new(pages.join("dealer.html")))
            .route_service("/user", ServeFile::new(pages.join("user.html")))
            .route_service("/offline.html", ServeFile::new(pages.join("offline.html")))
            .route_service("/service-worker.js", service_worker)
            .fallback_service(ServeDir::new(dir));
    }

    app.layer(TraceLayer::new_for_http())
}
