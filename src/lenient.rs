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

//! Field decoders for stored documents.
//!
//! Documents written by earlier servers hold whatever the client sent:
//! numeric strings, fractional amounts, `null` game tags, timestamps in
//! milliseconds. A single odd field must not make the whole collection
//! undecodable, so these decoders coerce instead of failing. Only a document
//! that is not a JSON array of objects counts as corrupt.

use crate::amount::parse_number;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

/// Integers, fractional numbers (floored) and numeric strings; anything else
/// is zero.
pub(crate) fn integer<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(to_integer(&value))
}

/// Like [`integer`], but negative values are clamped to zero. Used for user
/// counters, which must never be negative.
pub(crate) fn counter<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let n = to_integer(&value);
    if n < 0 {
        warn!(stored = %value, "Negative stored counter clamped to zero");
        return Ok(0);
    }
    Ok(n)
}

/// Strings as is; numbers and booleans in their JSON form; `null` and
/// anything else as the empty string.
pub(crate) fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

/// RFC 3339 strings (with or without fractional seconds) or epoch
/// milliseconds; anything else is the Unix epoch.
pub(crate) fn timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let parsed = match Value::deserialize(deserializer)? {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    };
    Ok(parsed.unwrap_or_default())
}

fn to_integer(value: &Value) -> i64 {
    parse_number(value)
        .and_then(|d| d.floor().to_i64())
        .unwrap_or(0)
}
