// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Ledger amounts.
//!
//! Balances and transaction values are arbitrary precision unsigned integers
//! expressed in base units of an 18 decimals fixed point token.
use num_bigint::BigUint;
use std::str::FromStr;
use thiserror::Error;

/// A ledger amount in base units.
pub type Amount = BigUint;

/// Number of decimals of one whole token.
pub const DECIMALS: u32 = 18;

/// Returns the amount in base units for a number of whole tokens.
pub fn units(whole: u64) -> Amount {
    BigUint::from(whole) * BigUint::from(10u32).pow(DECIMALS)
}

/// Error returned by [parse_amount].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid amount {0:?}")]
pub struct ParseAmountError(pub String);

/// Parses a base units decimal string.
///
/// Negative values, signs, fractions and any non digit character are rejected.
pub fn parse_amount(s: &str) -> Result<Amount, ParseAmountError> {
    let digits = s.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseAmountError(s.to_string()));
    }

    BigUint::from_str(digits).map_err(|_| ParseAmountError(s.to_string()))
}

/// Serde helpers that encode an [Amount] as a decimal string.
///
/// Use with `#[serde(with = "pokerchain_core::amount::serde_decimal")]`.
pub mod serde_decimal {
    use super::*;
    use serde::{Deserialize, Deserializer, Serializer, de};

    /// Serializes an amount as a decimal string.
    pub fn serialize<S>(amount: &Amount, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&amount.to_str_radix(10))
    }

    /// Deserializes an amount from a decimal string.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Amount, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_amount(&s).map_err(de::Error::custom)
    }
}
