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

//! Transaction requests and the append-only history.
//!
//! History is kept newest-first. Entries are never edited or removed; each one
//! snapshots the user's balance and exchanged amount right after it applied.

use crate::base::UserId;
use crate::lenient;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Balance-changing operation requested by an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Add,
    Subtract,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Add => f.write_str("add"),
            Operation::Subtract => f.write_str("subtract"),
        }
    }
}

/// Kind of a history entry. `Generate` marks user creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Add,
    Subtract,
    Generate,
}

impl From<Operation> for EntryKind {
    fn from(op: Operation) -> Self {
        match op {
            Operation::Add => EntryKind::Add,
            Operation::Subtract => EntryKind::Subtract,
        }
    }
}

/// A request to move tokens on one user's balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub user_id: UserId,
    pub operation: Operation,
    pub amount: Decimal,
    /// Game or activity tag; `None` and `""` both mean the default bucket.
    pub category: Option<String>,
}

impl TransactionRequest {
    pub fn add(user_id: impl Into<UserId>, amount: Decimal) -> Self {
        Self {
            user_id: user_id.into(),
            operation: Operation::Add,
            amount,
            category: None,
        }
    }

    pub fn subtract(user_id: impl Into<UserId>, amount: Decimal) -> Self {
        Self {
            user_id: user_id.into(),
            operation: Operation::Subtract,
            amount,
            category: None,
        }
    }

    pub fn in_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Category with empty tags folded into `None`.
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref().filter(|c| !c.is_empty())
    }
}

/// Immutable record of one applied ledger operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub timestamp: DateTime<Utc>,
    pub id: UserId,
    #[serde(default, deserialize_with = "lenient::text")]
    pub games: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(default, deserialize_with = "lenient::integer")]
    pub amount: i64,
    #[serde(default, deserialize_with = "lenient::integer")]
    pub balance: i64,
    #[serde(default, deserialize_with = "lenient::integer")]
    pub exchanged_amount: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn empty_category_means_default_bucket() {
        let req = TransactionRequest::subtract("CC-2025-AAAAAA", dec!(10)).in_category("");
        assert_eq!(req.category(), None);

        let req = TransactionRequest::subtract("CC-2025-AAAAAA", dec!(10)).in_category("poker");
        assert_eq!(req.category(), Some("poker"));
    }

    #[test]
    fn entry_uses_type_field_on_the_wire() {
        let entry = HistoryEntry {
            timestamp: "2025-10-04T10:00:00Z".parse().unwrap(),
            id: UserId::new("CC-2025-AAAAAA"),
            games: "roulette".into(),
            kind: EntryKind::Subtract,
            amount: 100,
            balance: 50,
            exchanged_amount: 0,
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["type"], "subtract");
        assert_eq!(value["games"], "roulette");
        assert_eq!(value["exchangedAmount"], 0);
        assert_eq!(value["timestamp"], "2025-10-04T10:00:00Z");
    }

    #[test]
    fn entries_without_games_decode() {
        let entry: HistoryEntry = serde_json::from_value(json!({
            "timestamp": "2025-10-04T10:00:00.000Z",
            "id": "CC-2025-AAAAAA",
            "type": "add",
            "amount": 50,
            "balance": 150,
            "exchangedAmount": 0
        }))
        .unwrap();
        assert_eq!(entry.games, "");
        assert_eq!(entry.kind, EntryKind::Add);
    }

    #[test]
    fn entries_with_null_or_numeric_games_decode() {
        let entries: Vec<HistoryEntry> = serde_json::from_value(json!([
            {
                "timestamp": "2025-10-04T10:00:00.000Z",
                "id": "CC-2025-AAAAAA",
                "games": null,
                "type": "add",
                "amount": "12.5",
                "balance": 112.5,
                "exchangedAmount": 0
            },
            {
                "id": "CC-2025-AAAAAA",
                "games": 3,
                "type": "subtract",
                "amount": 2,
                "balance": 110
            }
        ]))
        .unwrap();
        assert_eq!(entries[0].games, "");
        assert_eq!(entries[0].amount, 12);
        assert_eq!(entries[0].balance, 112);
        assert_eq!(entries[1].games, "3");
        assert_eq!(entries[1].timestamp, DateTime::<Utc>::default());
        assert_eq!(entries[1].exchanged_amount, 0);
    }

    #[test]
    fn operation_maps_onto_entry_kind() {
        assert_eq!(EntryKind::from(Operation::Add), EntryKind::Add);
        assert_eq!(EntryKind::from(Operation::Subtract), EntryKind::Subtract);
        assert_eq!(Operation::Subtract.to_string(), "subtract");
    }
}
