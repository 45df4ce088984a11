//! Amount type for handling monetary values with optional dollar signs.
//!
//! This module provides the `Amount` type which wraps `Decimal` and handles parsing values that
//! may or may not include a dollar sign and commas. Amounts are never negative: whether money came
//! in or went out is carried by the transaction type.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::error::Error;
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;
use tracing::trace;

/// Represents a non-negative money amount.
///
/// # Examples
///
/// Parsing with dollar sign and commas:
/// ```
/// # use finboard::model::Amount;
/// # use std::str::FromStr;
/// let amount = Amount::from_str("$1,250.00").unwrap();
/// assert_eq!(amount.to_string(), "1250.00");
/// ```
///
/// Lenient parsing falls back to zero:
/// ```
/// # use finboard::model::Amount;
/// let amount = Amount::parse_lenient("twelve");
/// assert!(amount.is_zero());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    /// The largest amount that parses, one quadrillion. Larger text is not an amount.
    pub const MAX: Decimal = Decimal::from_parts(2_764_472_320, 232_830, 0, false, 0);

    /// Creates an `Amount` from `value`. The sign is dropped.
    pub fn new(value: Decimal) -> Self {
        Self(value.abs())
    }

    /// Parses `s`, substituting zero for anything that is not a number.
    pub fn parse_lenient(s: &str) -> Self {
        match Amount::from_str(s) {
            Ok(amount) => amount,
            Err(e) => {
                trace!("Amount '{s}' could not be parsed ({e}), using 0");
                Amount::ZERO
            }
        }
    }

    /// Returns the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

/// An error that can occur when parsing strings into `Amount` values.
pub struct AmountError(String);

impl Debug for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl Display for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl Error for AmountError {}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(AmountError(String::from("an empty string is not an amount")));
        }

        // "-$50.00", "$50.00", "-50.00" and "50.00" are all accepted
        let (negative, rest) = match trimmed.strip_prefix('-') {
            Some(after_minus) => (true, after_minus),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };
        let rest = rest.strip_prefix('$').unwrap_or(rest);

        // Remove commas (thousand separators)
        let without_commas = rest.replace(',', "");

        let value = Decimal::from_str(&without_commas)
            .or_else(|_| Decimal::from_scientific(&without_commas))
            .map_err(|e| AmountError(format!("'{s}' is not an amount: {e}")))?;
        if value.abs() > Amount::MAX {
            return Err(AmountError(format!(
                "'{s}' is larger than {} and is not a plausible amount",
                Amount::MAX
            )));
        }
        let value = if negative { -value } else { value };
        Ok(Amount::new(value))
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl Add for Amount {
    type Output = Amount;

    /// Saturates at `Decimal::MAX` instead of overflowing.
    fn add(self, rhs: Self) -> Self::Output {
        Amount(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Amount>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Amount::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.value()
    }
}

/// Formats `value` with thousands separators, rounded to whole units, e.g. `12,346`.
pub fn format_whole(value: Decimal) -> String {
    format_num::format_num!(",.0f", value.to_f64().unwrap_or_default())
}
