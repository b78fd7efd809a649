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

//! Leaderboard projection.

use crate::base::UserId;
use crate::user::User;
use serde::{Deserialize, Serialize};

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub id: UserId,
    #[serde(default, deserialize_with = "crate::lenient::integer")]
    pub balance: i64,
}

/// Sorts users by balance, highest first.
///
/// Users with equal balances keep their order in the users document, which
/// is creation order.
pub fn project(users: &[User]) -> Vec<RankingEntry> {
    let mut ranking: Vec<RankingEntry> = users
        .iter()
        .map(|u| RankingEntry {
            id: u.id.clone(),
            balance: u.balance,
        })
        .collect();
    ranking.sort_by(|a, b| b.balance.cmp(&a.balance));
    ranking
}
