//! Decimal money handling.
//!
//! The backend serializes amounts either as JSON strings (`"19.99"`) or as
//! numbers, depending on the serializer. `rust_decimal`'s `serde-with-str`
//! feature accepts both.

use core::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A monetary amount in the store currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price from a decimal amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a price from minor units (e.g. cents).
    #[must_use]
    pub fn from_minor(minor: i64) -> Self {
        Self(Decimal::new(minor, 2))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Multiply by a quantity.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }

    /// Subtract, never going below zero.
    #[must_use]
    pub fn saturating_sub(self, other: Self) -> Self {
        if other.0 >= self.0 {
            Self::ZERO
        } else {
            Self(self.0 - other.0)
        }
    }

    /// Whether the amount is zero or negative.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 <= Decimal::ZERO
    }
}

impl core::ops::Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl core::iter::Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, p| acc + p)
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_money(self.0))
    }
}

/// Format an amount for display with two decimal places, e.g. `₹1,299.50`.
///
/// The store currency symbol is fixed; multi-currency is the backend's concern.
#[must_use]
pub fn format_money(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.2}", rounded.abs());
    let (whole, frac) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if negative {
        format!("-₹{grouped}.{frac}")
    } else {
        format!("₹{grouped}.{frac}")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_format_money_groups_thousands() {
        assert_eq!(format_money(Decimal::new(129_950, 2)), "₹1,299.50");
        assert_eq!(format_money(Decimal::new(5, 0)), "₹5.00");
        assert_eq!(format_money(Decimal::new(100_000_000, 2)), "₹1,000,000.00");
    }

    #[test]
    fn test_format_money_negative() {
        assert_eq!(format_money(Decimal::new(-250, 2)), "-₹2.50");
    }

    #[test]
    fn test_price_accepts_string_and_number() {
        let from_str: Price = serde_json::from_str("\"19.99\"").unwrap();
        let from_num: Price = serde_json::from_str("19.99").unwrap();
        assert_eq!(from_str, from_num);
        assert_eq!(from_str, Price::from_minor(1999));
    }

    #[test]
    fn test_saturating_sub() {
        let a = Price::from_minor(500);
        let b = Price::from_minor(700);
        assert_eq!(a.saturating_sub(b), Price::ZERO);
        assert_eq!(b.saturating_sub(a), Price::from_minor(200));
    }
}
