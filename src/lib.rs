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

//! # Token Ledger
//!
//! This library provides the ledger behind a cashless token economy at an
//! event: players carry a card id, dealers add or subtract tokens at the
//! games, and prizes are redeemed at the exchange counter.
//!
//! ## Core Components
//!
//! - [`Ledger`]: Applies create/add/subtract and keeps history and ranking in step
//! - [`CategoryLimits`]: Per-game spending caps and the per-user exchange cap
//! - [`Repository`]: Whole-document persistence over a [`DocumentStore`]
//! - [`server`]: HTTP API in front of the ledger
//! - [`LedgerError`]: Error types for ledger failures
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use rust_decimal_macros::dec;
//! use token_ledger::{
//!     CategoryLimits, Ledger, MemoryStore, OnCorrupt, Repository, TransactionRequest,
//! };
//!
//! let repository = Repository::new(Arc::new(MemoryStore::new()), OnCorrupt::Fail);
//! let ledger = Ledger::new(repository, CategoryLimits::default());
//!
//! let user = ledger.create_user(Some("CC-2025-DEMO01"), Some(dec!(100))).unwrap();
//!
//! let request = TransactionRequest::subtract(user.id.clone(), dec!(80)).in_category("roulette");
//! let snapshot = ledger.apply(&request).unwrap();
//! assert_eq!(snapshot.balance, 20);
//! ```
//!
//! ## Thread Safety
//!
//! All mutations go through one lock per [`Ledger`], so the whole-document
//! read-modify-write cycle never interleaves, even on a multi-threaded runtime.

pub mod amount;
mod base;
mod engine;
pub mod error;
mod history;
mod lenient;
pub mod limits;
pub mod ranking;
pub mod server;
pub mod storage;
mod user;

pub use base::{IdGenerator, RandomIdGenerator, UserId};
pub use engine::{DashboardStats, Ledger};
pub use error::{LedgerError, StorageError};
pub use history::{EntryKind, HistoryEntry, Operation, TransactionRequest};
pub use limits::CategoryLimits;
pub use ranking::RankingEntry;
pub use storage::{Collection, DocumentStore, FileStore, MemoryStore, OnCorrupt, Repository};
pub use user::{BalanceSnapshot, User};
