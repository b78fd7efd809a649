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

//! User balances.
//!
//! A user holds two counters: the spendable `balance`, which feeds the
//! ranking, and `exchanged_amount`, the running total redeemed for prizes.
//! Prize redemption grows `exchanged_amount` without touching `balance`.
//!
//! # Example
//!
//! ```
//! use chrono::Utc;
//! use token_ledger::{User, UserId};
//!
//! let user = User::new(UserId::new("CC-2025-ABC123"), 100, Utc::now());
//! assert_eq!(user.balance, 100);
//! assert_eq!(user.exchanged_amount, 0);
//! ```

use crate::LedgerError;
use crate::base::UserId;
use crate::lenient;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ledger user as stored in the users document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    #[serde(default, deserialize_with = "lenient::counter")]
    pub balance: i64,
    #[serde(default, deserialize_with = "lenient::counter")]
    pub exchanged_amount: i64,
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(id: UserId, balance: i64, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            balance,
            exchanged_amount: 0,
            created_at,
        }
    }

    fn assert_invariants(&self) {
        debug_assert!(
            self.balance >= 0,
            "Invariant violated: balance went negative: {}",
            self.balance
        );
        debug_assert!(
            self.exchanged_amount >= 0,
            "Invariant violated: exchanged amount went negative: {}",
            self.exchanged_amount
        );
    }

    /// Fails with [`LedgerError::InsufficientFunds`] if `amount` exceeds the balance.
    pub(crate) fn ensure_covers(&self, amount: i64) -> Result<(), LedgerError> {
        if amount > self.balance {
            return Err(LedgerError::InsufficientFunds);
        }
        Ok(())
    }

    /// Increases the balance.
    pub(crate) fn credit(&mut self, amount: i64) -> Result<(), LedgerError> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::InvalidArgument("balance would overflow".into()))?;
        self.assert_invariants();
        Ok(())
    }

    /// Decreases the balance.
    pub(crate) fn debit(&mut self, amount: i64) -> Result<(), LedgerError> {
        self.ensure_covers(amount)?;
        self.balance -= amount;
        self.assert_invariants();
        Ok(())
    }

    /// Records a prize redemption. The balance is left as is.
    pub(crate) fn redeem(&mut self, amount: i64) -> Result<(), LedgerError> {
        self.exchanged_amount = self
            .exchanged_amount
            .checked_add(amount)
            .ok_or_else(|| LedgerError::InvalidArgument("exchanged amount would overflow".into()))?;
        self.assert_invariants();
        Ok(())
    }
}

/// Balance view returned by balance lookups and transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSnapshot {
    pub id: UserId,
    pub balance: i64,
    pub exchanged_amount: i64,
}

impl From<&User> for BalanceSnapshot {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            balance: user.balance,
            exchanged_amount: user.exchanged_amount,
        }
    }
}
