//! # Money Module
//!
//! Provides the `Money` type and the two storefront currencies.
//!
//! ## Why Integer Minor Units?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  PER-GRAM PRICING                                                       │
//! │                                                                         │
//! │  Hair is priced per gram: 5 Kč/g × 200 g = 1000 Kč                     │
//! │                                                                         │
//! │  With floats, 0.35 €/g × 137 g drifts by fractions of a cent on        │
//! │  every line. Stored totals would disagree with recomputed ones.        │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units per gram                            │
//! │    500 haléřů/g × 200 g = 100 000 haléřů = 1000.00 Kč                  │
//! │    35 cents/g  × 137 g  = 4 795 cents    = 47.95 €                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use strand_core::money::{Currency, Money};
//!
//! let per_gram = Money::from_minor(500); // 5.00 Kč per gram
//! let line = per_gram.multiply_quantity(200);
//! assert_eq!(line.minor(), 100_000);
//! assert_eq!(line.display_in(Currency::Czk), "1000.00 CZK");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Currency
// =============================================================================

/// Currencies the storefront sells in.
///
/// Every SKU carries a per-gram price in both; an order is priced in exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// Czech koruna, minor unit haléř.
    #[default]
    Czk,
    /// Euro, minor unit cent.
    Eur,
}

impl Currency {
    /// ISO 4217 code.
    pub const fn code(&self) -> &'static str {
        match self {
            Currency::Czk => "CZK",
            Currency::Eur => "EUR",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (haléř or cent).
///
/// ## Design Decisions
/// - **i64 (signed)**: discounts are subtracted as Money, totals are clamped at zero
/// - **Currency-less**: the currency travels alongside (order, price pair), as it
///   does in the tables; mixing is prevented by [`PricePerGram::in_currency`]
///
/// [`PricePerGram::in_currency`]: crate::types::PricePerGram::in_currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ## Example
    /// ```rust
    /// use strand_core::money::Money;
    ///
    /// let price = Money::from_minor(1099);
    /// assert_eq!(price.minor(), 1099);
    /// ```
    #[inline]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Creates a Money value from major and minor parts.
    ///
    /// For negative amounts only the major part should be negative:
    /// `from_major_minor(-5, 50)` is -5.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies money by a quantity (grams, pieces).
    ///
    /// ## Example
    /// ```rust
    /// use strand_core::money::Money;
    ///
    /// let per_gram = Money::from_minor(500);
    /// assert_eq!(per_gram.multiply_quantity(200).minor(), 100_000);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Like [`Money::multiply_quantity`], `None` on overflow.
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(v) => Some(Money(v)),
            None => None,
        }
    }

    /// `self + other`, `None` on overflow.
    #[inline]
    pub const fn checked_add(self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(v) => Some(Money(v)),
            None => None,
        }
    }

    /// Sums `amounts`, `None` if any partial sum overflows.
    pub fn checked_sum(amounts: impl IntoIterator<Item = Money>) -> Option<Self> {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, m| acc.checked_add(m))
    }

    /// Subtracts `other`, never going below zero.
    ///
    /// Used for order totals: a discount larger than the order makes it free,
    /// it never makes the shop owe the customer.
    #[inline]
    pub fn saturating_sub_to_zero(self, other: Money) -> Money {
        Money(self.0.saturating_sub(other.0).max(0))
    }

    /// Formats the amount with its currency code, e.g. `1000.00 CZK`.
    pub fn display_in(&self, currency: Currency) -> String {
        format!("{} {}", self, currency)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain decimal rendering; UI formatting (separators, symbols) is the frontend's job.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
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

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_minor() {
        let money = Money::from_minor(1099);
        assert_eq!(money.minor(), 1099);
        assert_eq!(money.major(), 10);
        assert_eq!(money.minor_part(), 99);
    }

    #[test]
    fn test_from_major_minor() {
        assert_eq!(Money::from_major_minor(10, 99).minor(), 1099);
        assert_eq!(Money::from_major_minor(-5, 50).minor(), -550);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_minor(1099).to_string(), "10.99");
        assert_eq!(Money::from_minor(-550).to_string(), "-5.50");
        assert_eq!(Money::from_minor(0).to_string(), "0.00");
        assert_eq!(Money::from_minor(100_000).display_in(Currency::Czk), "1000.00 CZK");
        assert_eq!(Money::from_minor(4795).display_in(Currency::Eur), "47.95 EUR");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_minor(1000);
        let b = Money::from_minor(500);

        assert_eq!((a + b).minor(), 1500);
        assert_eq!((a - b).minor(), 500);
        assert_eq!((a * 3).minor(), 3000);

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.minor(), 2000);
    }

    #[test]
    fn test_per_gram_line() {
        // 5 Kč per gram, 200 g
        let per_gram = Money::from_minor(500);
        assert_eq!(per_gram.multiply_quantity(200).minor(), 100_000);
    }

    #[test]
    fn test_checked_arithmetic() {
        let per_gram = Money::from_minor(500);
        assert_eq!(per_gram.checked_multiply_quantity(200), Some(Money::from_minor(100_000)));
        assert_eq!(Money::from_minor(i64::MAX / 10).checked_multiply_quantity(100), None);

        assert_eq!(Money::from_minor(i64::MAX).checked_add(Money::from_minor(1)), None);
        assert_eq!(
            Money::checked_sum([per_gram, per_gram, Money::from_minor(1)]),
            Some(Money::from_minor(1001))
        );
        assert_eq!(Money::checked_sum([Money::from_minor(i64::MAX), per_gram]), None);
        assert_eq!(Money::checked_sum(Vec::<Money>::new()), Some(Money::zero()));
    }

    #[test]
    fn test_saturating_sub_to_zero() {
        let subtotal = Money::from_minor(1000);
        assert_eq!(subtotal.saturating_sub_to_zero(Money::from_minor(300)).minor(), 700);
        assert_eq!(subtotal.saturating_sub_to_zero(Money::from_minor(5000)), Money::zero());
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        assert!(Money::from_minor(100).is_positive());
        assert!(Money::from_minor(-100).is_negative());
        assert_eq!(Money::from_minor(-100).abs().minor(), 100);
    }

    #[test]
    fn test_currency_serde() {
        assert_eq!(serde_json::to_string(&Currency::Czk).unwrap(), "\"CZK\"");
        let eur: Currency = serde_json::from_str("\"EUR\"").unwrap();
        assert_eq!(eur, Currency::Eur);
    }
}
