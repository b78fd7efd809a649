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

//! Property-based tests for the ledger.
//!
//! These tests verify invariants that should hold for any sequence of
//! operations, accepted or rejected.

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::sync::Arc;
use token_ledger::{
    CategoryLimits, Ledger, LedgerError, MemoryStore, OnCorrupt, Operation, Repository,
    TransactionRequest, UserId,
};

// =============================================================================
// Arbitrary Strategies
// =============================================================================

const CATEGORIES: [&str; 8] = [
    "", "poker", "blackjack", "roulette", "ring-toss", "shooting", "exchange", "bingo",
];

#[derive(Debug, Clone)]
struct Op {
    operation: Operation,
    amount: i64,
    category: &'static str,
}

fn arb_op() -> impl Strategy<Value = Op> {
    (
        prop_oneof![Just(Operation::Add), Just(Operation::Subtract)],
        1i64..=700,
        prop::sample::select(CATEGORIES.to_vec()),
    )
        .prop_map(|(operation, amount, category)| Op {
            operation,
            amount,
            category,
        })
}

fn new_ledger() -> Ledger {
    let repository = Repository::new(Arc::new(MemoryStore::new()), OnCorrupt::Fail);
    Ledger::new(repository, CategoryLimits::default())
}

fn request(id: &str, op: &Op) -> TransactionRequest {
    TransactionRequest {
        user_id: UserId::new(id),
        operation: op.operation,
        amount: Decimal::from(op.amount),
        category: Some(op.category.to_string()),
    }
}

/// Reference model of one user's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Model {
    balance: i64,
    exchanged: i64,
}

impl Model {
    /// Applies `op` if the ledger rules accept it; returns whether it did.
    fn apply(&mut self, op: &Op, limits: &CategoryLimits) -> bool {
        match op.operation {
            Operation::Add => {
                self.balance += op.amount;
                true
            }
            Operation::Subtract => {
                if op.amount > self.balance {
                    return false;
                }
                let category = Some(op.category).filter(|c| !c.is_empty());
                let limit = limits.limit(category);
                if op.category == "exchange" {
                    if self.exchanged >= limit {
                        return false;
                    }
                    self.exchanged += op.amount;
                } else {
                    if op.amount > limit {
                        return false;
                    }
                    self.balance -= op.amount;
                }
                true
            }
        }
    }
}

// =============================================================================
// Balance Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// The ledger accepts and rejects exactly what the model does, and the
    /// final counters match: adds minus non-exchange subtracts.
    #[test]
    fn ledger_matches_reference_model(
        opening in 0i64..=2_000,
        ops in prop::collection::vec(arb_op(), 1..30),
    ) {
        let ledger = new_ledger();
        let limits = CategoryLimits::default();
        ledger.create_user(Some("p1"), Some(Decimal::from(opening))).unwrap();
        let mut model = Model { balance: opening, exchanged: 0 };

        for op in &ops {
            let accepted = model.apply(op, &limits);
            let result = ledger.apply(&request("p1", op));
            prop_assert_eq!(result.is_ok(), accepted, "op {:?} -> {:?}", op, result);
        }

        let snapshot = ledger.balance(&UserId::new("p1")).unwrap();
        prop_assert_eq!(snapshot.balance, model.balance);
        prop_assert_eq!(snapshot.exchanged_amount, model.exchanged);
    }

    /// Balance is never negative and rejected operations change nothing.
    #[test]
    fn rejected_operations_leave_no_trace(
        opening in 0i64..=500,
        ops in prop::collection::vec(arb_op(), 1..30),
    ) {
        let ledger = new_ledger();
        ledger.create_user(Some("p1"), Some(Decimal::from(opening))).unwrap();

        for op in &ops {
            let before = ledger.balance(&UserId::new("p1")).unwrap();
            let history_len = ledger.history().unwrap().len();

            match ledger.apply(&request("p1", op)) {
                Ok(after) => {
                    prop_assert!(after.balance >= 0);
                    prop_assert!(after.exchanged_amount >= before.exchanged_amount);
                    prop_assert_eq!(ledger.history().unwrap().len(), history_len + 1);
                }
                Err(e) => {
                    let expected_err = matches!(
                        e,
                        LedgerError::InsufficientFunds | LedgerError::LimitExceeded { .. }
                    );
                    prop_assert!(expected_err);
                    prop_assert_eq!(ledger.balance(&UserId::new("p1")).unwrap(), before);
                    prop_assert_eq!(ledger.history().unwrap().len(), history_len);
                }
            }
        }
    }

    /// Subtracting more than the balance always fails.
    #[test]
    fn cannot_overdraw(
        opening in 0i64..=1_000,
        extra in 1i64..=1_000,
        category in prop::sample::select(CATEGORIES.to_vec()),
    ) {
        let ledger = new_ledger();
        ledger.create_user(Some("p1"), Some(Decimal::from(opening))).unwrap();

        let result = ledger.apply(
            &TransactionRequest::subtract("p1", Decimal::from(opening + extra)).in_category(category),
        );
        prop_assert_eq!(result, Err(LedgerError::InsufficientFunds));
        prop_assert_eq!(ledger.balance(&UserId::new("p1")).unwrap().balance, opening);
    }
}

// =============================================================================
// History and Ranking Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Each history entry snapshots the user right after it applied.
    #[test]
    fn history_snapshots_match_user_state(
        ops in prop::collection::vec((0usize..3, arb_op()), 1..25),
    ) {
        let ledger = new_ledger();
        let ids = ["p0", "p1", "p2"];
        for id in ids {
            ledger.create_user(Some(id), Some(Decimal::from(300))).unwrap();
        }

        for (who, op) in &ops {
            let id = ids[*who];
            if let Ok(snapshot) = ledger.apply(&request(id, op)) {
                let head = ledger.history().unwrap()[0].clone();
                prop_assert_eq!(head.id.as_str(), id);
                prop_assert_eq!(head.amount, op.amount);
                prop_assert_eq!(head.balance, snapshot.balance);
                prop_assert_eq!(head.exchanged_amount, snapshot.exchanged_amount);
            }
        }
    }

    /// After any mutation the ranking is the users sorted by balance.
    #[test]
    fn ranking_is_sorted_after_every_mutation(
        openings in prop::collection::vec(0i64..=1_000, 1..6),
        ops in prop::collection::vec((0usize..6, arb_op()), 0..25),
    ) {
        let ledger = new_ledger();
        let ids: Vec<String> = (0..openings.len()).map(|i| format!("p{i}")).collect();
        for (id, opening) in ids.iter().zip(&openings) {
            ledger.create_user(Some(id), Some(Decimal::from(*opening))).unwrap();
        }

        for (who, op) in &ops {
            let id = &ids[who % ids.len()];
            let _ = ledger.apply(&request(id, op));

            let ranking = ledger.ranking().unwrap();
            let users = ledger.users().unwrap();
            prop_assert_eq!(ranking.len(), users.len());
            prop_assert!(ranking.windows(2).all(|w| w[0].balance >= w[1].balance));
            for entry in &ranking {
                let user = users.iter().find(|u| u.id == entry.id).unwrap();
                prop_assert_eq!(entry.balance, user.balance);
            }
        }
    }
}
