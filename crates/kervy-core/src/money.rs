//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Prices typed on a phone keypad arrive as decimals:                    │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    price 45.50 is stored as 4550, change is computed in cents          │
//! │    and only formatted back to a decimal when printed                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use kervy_core::money::Money;
//!
//! let price = Money::from_cents(4550);
//! let total = price * 2 + Money::from_cents(1000);
//! assert_eq!(total.cents(), 10100);
//! assert_eq!(total.with_symbol("P"), "P 101.00");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (centavos, cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: change can be computed before it is validated
/// - **Single field tuple struct**: serializes as a bare integer
///
/// ## Where Money is Used
/// ```text
/// Product.price_cents ──► CartItem.unit_price ──► CartItem.line_total
///                                                        │
/// Cart.total ──► CheckoutSummary { total, cash, change } ◄┘
///                        │
///                        └──► Receipt "P 101.00"
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use kervy_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Parses an operator-entered decimal amount such as `"45.5"` or `"100"`.
    ///
    /// At most two fractional digits are accepted.
    ///
    /// ## Example
    /// ```rust
    /// use kervy_core::money::Money;
    ///
    /// assert_eq!(Money::parse("45.5").unwrap().cents(), 4550);
    /// assert_eq!(Money::parse("100").unwrap().cents(), 10000);
    /// assert!(Money::parse("1.234").is_none());
    /// ```
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        let (negative, digits) = match input.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, input),
        };

        let (major, minor) = match digits.split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (digits, ""),
        };

        if major.is_empty() && minor.is_empty() {
            return None;
        }
        if minor.len() > 2 || !major.chars().chain(minor.chars()).all(|c| c.is_ascii_digit()) {
            return None;
        }

        let major: i64 = if major.is_empty() { 0 } else { major.parse().ok()? };
        let minor: i64 = match minor.len() {
            0 => 0,
            1 => minor.parse::<i64>().ok()? * 10,
            _ => minor.parse().ok()?,
        };

        let cents = major.checked_mul(100)?.checked_add(minor)?;
        Some(Money(if negative { -cents } else { cents }))
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Pesos part, without the sign.
    const fn major(&self) -> i64 {
        (self.0 / 100).abs()
    }

    /// Centavos part (0-99).
    const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use kervy_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299);
    /// assert_eq!(unit_price.multiply_quantity(3).cents(), 897);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Formats the amount with a currency symbol, as printed on receipts.
    ///
    /// ## Example
    /// ```rust
    /// use kervy_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(9100).with_symbol("P"), "P 91.00");
    /// ```
    pub fn with_symbol(&self, symbol: &str) -> String {
        format!("{} {}", symbol, self)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain decimal rendering (`-5.50`, `91.00`), no currency symbol.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major(), self.minor())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money(0)
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money(0), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.major(), 10);
        assert_eq!(money.minor(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "10.99");
        assert_eq!(Money::from_cents(500).to_string(), "5.00");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
        assert_eq!(Money::from_cents(0).to_string(), "0.00");
    }

    #[test]
    fn test_with_symbol() {
        assert_eq!(Money::from_cents(12345).with_symbol("P"), "P 123.45");
    }

    #[test]
    fn test_parse() {
        assert_eq!(Money::parse("45.50").map(|m| m.cents()), Some(4550));
        assert_eq!(Money::parse("45.5").map(|m| m.cents()), Some(4550));
        assert_eq!(Money::parse(".75").map(|m| m.cents()), Some(75));
        assert_eq!(Money::parse("-2").map(|m| m.cents()), Some(-200));
        assert_eq!(Money::parse(" 7 ").map(|m| m.cents()), Some(700));

        assert!(Money::parse("").is_none());
        assert!(Money::parse(".").is_none());
        assert!(Money::parse("1.234").is_none());
        assert!(Money::parse("abc").is_none());
        assert!(Money::parse("1,000").is_none());
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_is_zero() {
        assert!(Money::default().is_zero());
        assert!(!Money::from_cents(-1).is_zero());
    }

    #[test]
    fn test_serializes_as_integer() {
        let json = serde_json::to_string(&Money::from_cents(4550)).unwrap();
        assert_eq!(json, "4550");
    }
}
