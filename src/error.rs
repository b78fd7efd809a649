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

//! Error types for ledger operations.

use crate::storage::Collection;
use thiserror::Error;

/// Errors raised by the document store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Reading or writing the backing document failed
    #[error("failed to access {collection} document: {reason}")]
    Io {
        collection: Collection,
        reason: String,
    },

    /// The stored document is not valid JSON for its collection
    #[error("{collection} document is corrupt: {reason}")]
    Corrupt {
        collection: Collection,
        reason: String,
    },

    /// The data directory was expected to exist but does not
    #[error("data directory {0} does not exist")]
    MissingDirectory(String),

    /// A collection could not be encoded as JSON
    #[error("failed to encode {collection} document: {reason}")]
    Encode {
        collection: Collection,
        reason: String,
    },
}

/// Ledger operation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Missing or malformed id, or a non-positive / non-numeric amount
    #[error("invalid request: {0}")]
    InvalidArgument(String),

    /// No user with the given id
    #[error("ID not found")]
    NotFound,

    /// A user with the requested id already exists
    #[error("id already exists: {0}")]
    Conflict(String),

    /// Subtract would drive the balance below zero
    #[error("insufficient balance")]
    InsufficientFunds,

    /// Category spending cap violated
    #[error("{category} limit of {limit} exceeded")]
    LimitExceeded { category: String, limit: i64 },

    /// Every generated candidate id collided with an existing user
    #[error("could not generate a unique user id after {attempts} attempts")]
    IdSpaceExhausted { attempts: usize },

    /// Backing document could not be read or written
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl LedgerError {
    /// Machine-readable code reported alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::InvalidArgument(_) => "INVALID_ARGUMENT",
            LedgerError::NotFound => "NOT_FOUND",
            LedgerError::Conflict(_) => "CONFLICT",
            LedgerError::InsufficientFunds => "INSUFFICIENT_FUNDS",
            LedgerError::LimitExceeded { .. } => "LIMIT_EXCEEDED",
            LedgerError::IdSpaceExhausted { .. } | LedgerError::Storage(_) => "INTERNAL_ERROR",
        }
    }

    /// True for failures of the process rather than of the request.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            LedgerError::IdSpaceExhausted { .. } | LedgerError::Storage(_)
        )
    }
}
