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

//! Ledger engine.
//!
//! The [`Ledger`] applies balance-changing operations to one user at a time
//! and keeps history and ranking in step with the users document.
//!
//! # Operations
//!
//! - **Create user**: registers a user with an opening balance.
//! - **Add**: credits tokens won at a game.
//! - **Subtract**: debits tokens staked at a game, capped per game.
//! - **Subtract / exchange**: redeems tokens for prizes. The balance stays as
//!   is and the user's exchanged amount grows instead.
//!
//! Every mutation is a whole-collection read-modify-write: load users and
//! history, validate, mutate in memory, write both back, then recompute and
//! write the ranking.
//!
//! # Thread Safety
//!
//! Mutations are serialized by a single process-wide lock, which also owns
//! the id generator. Reads skip the lock; documents are replaced whole, so a
//! reader sees either the previous or the next state.

use crate::amount::{opening_balance, whole_tokens};
use crate::base::{IdGenerator, RandomIdGenerator, UserId};
use crate::history::{EntryKind, HistoryEntry, Operation, TransactionRequest};
use crate::limits::{CategoryLimits, EXCHANGE};
use crate::ranking::{self, RankingEntry};
use crate::storage::Repository;
use crate::user::{BalanceSnapshot, User};
use crate::LedgerError;
use chrono::{Datelike, Utc};
use parking_lot::Mutex;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Aggregate figures for the operator dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub active_ids: usize,
    /// Sum of all balances. Wider than a single balance so it cannot overflow.
    pub total_balance: i128,
    pub total_transactions: usize,
}

/// State guarded by the mutation lock.
struct Writer {
    ids: Box<dyn IdGenerator>,
}

/// Token ledger over a [`Repository`].
///
/// # Invariants
///
/// - User ids are unique.
/// - A committed balance is never negative.
/// - History only grows, newest entry first.
/// - After every mutation the ranking document equals the users sorted by
///   balance, highest first.
pub struct Ledger {
    repository: Repository,
    limits: CategoryLimits,
    writer: Mutex<Writer>,
}

impl Ledger {
    /// Attempts at generating an unused id before giving up.
    pub const MAX_ID_ATTEMPTS: usize = 100;

    /// Creates a ledger with a randomly seeded id generator.
    pub fn new(repository: Repository, limits: CategoryLimits) -> Self {
        Self::with_id_generator(
            repository,
            limits,
            Box::new(RandomIdGenerator::new(StdRng::from_entropy())),
        )
    }

    pub fn with_id_generator(
        repository: Repository,
        limits: CategoryLimits,
        ids: Box<dyn IdGenerator>,
    ) -> Self {
        Self {
            repository,
            limits,
            writer: Mutex::new(Writer { ids }),
        }
    }

    pub fn limits(&self) -> &CategoryLimits {
        &self.limits
    }

    /// Registers a new user.
    ///
    /// A blank `requested_id` asks for a generated one. The opening balance is
    /// floored, and missing or negative balances become zero.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Conflict`] - the requested id is taken.
    /// - [`LedgerError::IdSpaceExhausted`] - no free id after [`Self::MAX_ID_ATTEMPTS`].
    /// - [`LedgerError::Storage`] - a document could not be read or written.
    pub fn create_user(
        &self,
        requested_id: Option<&str>,
        initial_balance: Option<Decimal>,
    ) -> Result<User, LedgerError> {
        let mut writer = self.writer.lock();
        let mut users = self.repository.load_users()?;
        let mut history = self.repository.load_history()?;
        let now = Utc::now();

        let requested = requested_id.map(str::trim).filter(|id| !id.is_empty());
        let id = match requested {
            Some(id) => {
                if users.iter().any(|u| u.id.as_str() == id) {
                    return Err(LedgerError::Conflict(id.to_string()));
                }
                UserId::new(id)
            }
            None => {
                let mut attempts = 0;
                loop {
                    if attempts == Self::MAX_ID_ATTEMPTS {
                        warn!(attempts, "Id generation exhausted");
                        return Err(LedgerError::IdSpaceExhausted { attempts });
                    }
                    attempts += 1;
                    let candidate = writer.ids.generate(now.year());
                    if !users.iter().any(|u| u.id == candidate) {
                        break candidate;
                    }
                }
            }
        };

        let balance = opening_balance(initial_balance);
        let user = User::new(id, balance, now);
        users.push(user.clone());
        self.repository.save_users(&users)?;

        history.insert(
            0,
            HistoryEntry {
                timestamp: now,
                id: user.id.clone(),
                games: String::new(),
                kind: EntryKind::Generate,
                amount: balance,
                balance,
                exchanged_amount: 0,
            },
        );
        self.repository.save_history(&history)?;
        self.recompute_ranking(&users)?;

        info!(user = %user.id, balance, "User created");
        Ok(user)
    }

    /// Applies an add or subtract to one user.
    ///
    /// | Operation | Category | Effect |
    /// |-----------|----------|--------|
    /// | add | any | `balance += amount` |
    /// | subtract | `exchange` | `exchanged_amount += amount` |
    /// | subtract | other / none | `balance -= amount` |
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidArgument`] - blank id, or amount not a positive whole number.
    /// - [`LedgerError::NotFound`] - unknown user.
    /// - [`LedgerError::InsufficientFunds`] - subtract exceeds the balance.
    /// - [`LedgerError::LimitExceeded`] - category cap violated.
    /// - [`LedgerError::Storage`] - a document could not be read or written.
    pub fn apply(&self, request: &TransactionRequest) -> Result<BalanceSnapshot, LedgerError> {
        if request.user_id.as_str().trim().is_empty() {
            return Err(LedgerError::InvalidArgument("missing id".into()));
        }
        let amount = whole_tokens(request.amount)?;
        let category = request.category();

        let _writer = self.writer.lock();
        let mut users = self.repository.load_users()?;
        let mut history = self.repository.load_history()?;

        let user = users
            .iter_mut()
            .find(|u| u.id == request.user_id)
            .ok_or(LedgerError::NotFound)?;

        match request.operation {
            Operation::Add => user.credit(amount)?,
            Operation::Subtract => {
                // Funds first, then the category cap. Exchange is also refused
                // when the balance cannot cover it, although it leaves the
                // balance as is.
                user.ensure_covers(amount)?;
                self.limits
                    .check_subtract(category, amount, user.exchanged_amount)?;
                if category == Some(EXCHANGE) {
                    user.redeem(amount)?;
                } else {
                    user.debit(amount)?;
                }
            }
        }

        let snapshot = BalanceSnapshot::from(&*user);
        history.insert(
            0,
            HistoryEntry {
                timestamp: Utc::now(),
                id: snapshot.id.clone(),
                games: category.unwrap_or_default().to_string(),
                kind: request.operation.into(),
                amount,
                balance: snapshot.balance,
                exchanged_amount: snapshot.exchanged_amount,
            },
        );

        self.repository.save_users(&users)?;
        self.repository.save_history(&history)?;
        self.recompute_ranking(&users)?;

        info!(
            user = %snapshot.id,
            op = %request.operation,
            amount,
            games = category.unwrap_or_default(),
            balance = snapshot.balance,
            exchanged = snapshot.exchanged_amount,
            "Transaction applied"
        );
        Ok(snapshot)
    }

    /// Looks up a user's balance and exchanged amount.
    pub fn balance(&self, user_id: &UserId) -> Result<BalanceSnapshot, LedgerError> {
        self.repository
            .load_users()?
            .iter()
            .find(|u| &u.id == user_id)
            .map(BalanceSnapshot::from)
            .ok_or(LedgerError::NotFound)
    }

    /// All users in creation order.
    pub fn users(&self) -> Result<Vec<User>, LedgerError> {
        Ok(self.repository.load_users()?)
    }

    /// Full history, newest first.
    pub fn history(&self) -> Result<Vec<HistoryEntry>, LedgerError> {
        Ok(self.repository.load_history()?)
    }

    /// Ranking as of the last mutation.
    pub fn ranking(&self) -> Result<Vec<RankingEntry>, LedgerError> {
        Ok(self.repository.load_ranking()?)
    }

    pub fn dashboard_stats(&self) -> Result<DashboardStats, LedgerError> {
        let users = self.repository.load_users()?;
        let history = self.repository.load_history()?;
        Ok(DashboardStats {
            active_ids: users.len(),
            total_balance: users.iter().map(|u| i128::from(u.balance)).sum(),
            total_transactions: history.len(),
        })
    }

    /// Start-up maintenance: rewrites legacy user records in canonical form
    /// and recomputes the ranking.
    ///
    /// Returns `true` if the users document was rewritten.
    pub fn normalize(&self) -> Result<bool, LedgerError> {
        let _writer = self.writer.lock();
        let rewritten = self.repository.normalize_users()?;
        if rewritten {
            info!("Legacy user records normalized");
        }
        let users = self.repository.load_users()?;
        self.recompute_ranking(&users)?;
        Ok(rewritten)
    }

    fn recompute_ranking(&self, users: &[User]) -> Result<(), LedgerError> {
        self.repository.save_ranking(&ranking::project(users))?;
        Ok(())
    }
}
