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

//! Per-category spending limits.
//!
//! Every game caps a single subtract at its own limit; unknown or missing
//! categories fall back to the `default` limit. The `exchange` category is
//! different: its limit caps how much one user may redeem in total, and is
//! checked against what the user has already redeemed before this request.
//!
//! The table is loaded once at start-up and never changes while serving.

use crate::LedgerError;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Category tag for prize redemption.
pub const EXCHANGE: &str = "exchange";

/// Key of the fallback limit.
pub const DEFAULT: &str = "default";

/// Errors while loading a limits file.
#[derive(Error, Debug)]
pub enum LimitsError {
    #[error("failed to read limits file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse limits file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("limits file must define a \"default\" limit")]
    MissingDefault,

    #[error("limit for {0} must not be negative")]
    Negative(String),
}

/// Category limit table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct CategoryLimits {
    limits: HashMap<String, i64>,
}

impl CategoryLimits {
    /// Builds a table from `(category, limit)` pairs plus the fallback.
    pub fn new<I, S>(limits: I, default: i64) -> Self
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<String>,
    {
        let mut limits: HashMap<String, i64> =
            limits.into_iter().map(|(k, v)| (k.into(), v)).collect();
        limits.insert(DEFAULT.to_string(), default);
        Self { limits }
    }

    /// Reads a JSON object of `category -> limit`. It must contain `default`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LimitsError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, LimitsError> {
        let table: CategoryLimits = serde_json::from_str(text)?;
        if !table.limits.contains_key(DEFAULT) {
            return Err(LimitsError::MissingDefault);
        }
        if let Some((category, _)) = table.limits.iter().find(|(_, v)| **v < 0) {
            return Err(LimitsError::Negative(category.clone()));
        }
        Ok(table)
    }

    /// Limit for `category`, falling back to the default bucket.
    pub fn limit(&self, category: Option<&str>) -> i64 {
        category
            .and_then(|c| self.limits.get(c))
            .or_else(|| self.limits.get(DEFAULT))
            .copied()
            .unwrap_or(0)
    }

    /// Validates a subtract of `amount` in `category` for a user who has
    /// already redeemed `exchanged_amount`.
    ///
    /// # Errors
    ///
    /// [`LedgerError::LimitExceeded`] naming the category and its limit.
    pub fn check_subtract(
        &self,
        category: Option<&str>,
        amount: i64,
        exchanged_amount: i64,
    ) -> Result<(), LedgerError> {
        let limit = self.limit(category);
        if category == Some(EXCHANGE) {
            // Cumulative pre-check: only users already at the cap are refused.
            if exchanged_amount >= limit {
                return Err(LedgerError::LimitExceeded {
                    category: EXCHANGE.to_string(),
                    limit,
                });
            }
        } else if amount > limit {
            return Err(LedgerError::LimitExceeded {
                category: category.unwrap_or(DEFAULT).to_string(),
                limit,
            });
        }
        Ok(())
    }

    /// Categories in name order, for logging.
    pub fn entries(&self) -> Vec<(&str, i64)> {
        let mut entries: Vec<_> = self.limits.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        entries.sort();
        entries
    }
}

impl Default for CategoryLimits {
    fn default() -> Self {
        Self::new(
            [
                ("poker", 500),
                ("blackjack", 400),
                ("roulette", 300),
                ("ring-toss", 200),
                ("shooting", 200),
                (EXCHANGE, 1000),
            ],
            100,
        )
    }
}
