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

//! Token amounts.
//!
//! Operators type amounts into a form, so requests may carry them as JSON
//! numbers or as numeric strings. They are parsed into a [`Decimal`] first so
//! that `12.5` is recognised as fractional rather than silently truncated, then
//! converted to whole tokens.

use crate::LedgerError;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::Value;
use std::str::FromStr;

/// Parses a JSON number or numeric string.
///
/// Returns `None` for anything else, including `null`, booleans and
/// non-numeric strings. Whitespace-only strings parse as zero.
pub fn parse_number(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Decimal::from(i))
            } else if let Some(u) = n.as_u64() {
                Some(Decimal::from(u))
            } else {
                n.as_f64().and_then(|f| Decimal::try_from(f).ok())
            }
        }
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Some(Decimal::ZERO);
            }
            Decimal::from_str(s)
                .or_else(|_| Decimal::from_scientific(s))
                .ok()
        }
        _ => None,
    }
}

/// Converts a transaction amount into whole tokens.
///
/// # Errors
///
/// [`LedgerError::InvalidArgument`] if the amount is not positive, has a
/// fractional part, or does not fit in an `i64`.
pub fn whole_tokens(amount: Decimal) -> Result<i64, LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidArgument(
            "amount must be greater than zero".into(),
        ));
    }
    if !amount.fract().is_zero() {
        return Err(LedgerError::InvalidArgument(
            "amount must be a whole number of tokens".into(),
        ));
    }
    amount
        .to_i64()
        .ok_or_else(|| LedgerError::InvalidArgument("amount is too large".into()))
}

/// Coerces an opening balance: missing, negative or oversized values become
/// zero and fractions are floored.
pub fn opening_balance(balance: Option<Decimal>) -> i64 {
    match balance {
        Some(b) if b > Decimal::ZERO => b.floor().to_i64().unwrap_or(0),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn parses_numbers_and_numeric_strings() {
        assert_eq!(parse_number(&json!(50)), Some(dec!(50)));
        assert_eq!(parse_number(&json!(12.5)), Some(dec!(12.5)));
        assert_eq!(parse_number(&json!(" 30 ")), Some(dec!(30)));
        assert_eq!(parse_number(&json!("1e2")), Some(dec!(100)));
        assert_eq!(parse_number(&json!("")), Some(Decimal::ZERO));
    }

    #[test]
    fn rejects_non_numeric_values() {
        assert_eq!(parse_number(&json!("abc")), None);
        assert_eq!(parse_number(&Value::Null), None);
        assert_eq!(parse_number(&json!(true)), None);
        assert_eq!(parse_number(&json!([1])), None);
    }

    #[test]
    fn whole_tokens_accepts_positive_integers() {
        assert_eq!(whole_tokens(dec!(150)), Ok(150));
        assert_eq!(whole_tokens(dec!(7.000)), Ok(7));
    }

    #[test]
    fn whole_tokens_rejects_zero_negative_and_fractions() {
        assert!(matches!(
            whole_tokens(Decimal::ZERO),
            Err(LedgerError::InvalidArgument(_))
        ));
        assert!(matches!(
            whole_tokens(dec!(-5)),
            Err(LedgerError::InvalidArgument(_))
        ));
        assert!(matches!(
            whole_tokens(dec!(2.5)),
            Err(LedgerError::InvalidArgument(_))
        ));
    }

    #[test]
    fn opening_balance_floors_and_clamps() {
        assert_eq!(opening_balance(Some(dec!(100))), 100);
        assert_eq!(opening_balance(Some(dec!(99.9))), 99);
        assert_eq!(opening_balance(Some(dec!(-10))), 0);
        assert_eq!(opening_balance(None), 0);
    }
}
