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

//! Core identifier types and user id generation.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a ledger user.
///
/// Usually printed on a QR card handed out at the entrance. Operators may
/// choose their own ids; otherwise one is generated by an [`IdGenerator`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        UserId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        UserId(id.to_string())
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        UserId(id)
    }
}

/// Produces candidate user ids. Uniqueness is checked by the caller.
pub trait IdGenerator: Send {
    fn generate(&mut self, year: i32) -> UserId;
}

/// Generates ids of the form `CC-<year>-<6 uppercase alphanumerics>`.
#[derive(Debug)]
pub struct RandomIdGenerator<R> {
    rng: R,
}

impl<R: Rng + Send> RandomIdGenerator<R> {
    const ALPHABET: &'static [u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    const SUFFIX_LEN: usize = 6;

    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng + Send> IdGenerator for RandomIdGenerator<R> {
    fn generate(&mut self, year: i32) -> UserId {
        let suffix: String = (0..Self::SUFFIX_LEN)
            .map(|_| {
                let idx = self.rng.gen_range(0..Self::ALPHABET.len());
                Self::ALPHABET[idx] as char
            })
            .collect();
        UserId(format!("CC-{year}-{suffix}"))
    }
}
