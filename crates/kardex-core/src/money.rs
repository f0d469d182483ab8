//! # Money Module
//!
//! Provides the `Money` type used for purchase costs, average costs and
//! inventory valuation.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Costs are stored with two decimals (céntimos).                         │
//! │                                                                         │
//! │  Weighted averages divide, so every division is explicit:               │
//! │    (10 × 1.00 + 3 × 2.00) / 13 = 1.2307… → 1.23                        │
//! │                                                                         │
//! │  One place rounds (`div_round`), everything else is exact integer math │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use kardex_core::money::Money;
//!
//! let cost = Money::from_cents(1099); // 10.99
//! let line = cost.multiply_quantity(3).unwrap();
//! assert_eq!(line.cents(), 3297);
//! ```
//!
//! Arithmetic is checked: an overflowing product or sum comes back as `None`
//! instead of wrapping into a wrong ledger value.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (céntimos).
///
/// Signed so that valuation deltas (exits) can be summed directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Multiplies a unit cost by a quantity.
    ///
    /// Returns `None` if the product does not fit in an `i64`.
    ///
    /// ## Example
    /// ```rust
    /// use kardex_core::money::Money;
    ///
    /// let unit_cost = Money::from_cents(299);
    /// assert_eq!(unit_cost.multiply_quantity(3), Some(Money::from_cents(897)));
    /// assert_eq!(Money::from_cents(i64::MAX).multiply_quantity(2), None);
    /// ```
    #[inline]
    pub fn multiply_quantity(&self, qty: i64) -> Option<Money> {
        self.0.checked_mul(qty).map(Money)
    }

    #[inline]
    pub fn checked_add(&self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    #[inline]
    pub fn checked_sub(&self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money)
    }

    /// Divides a wide numerator (in cents) by a positive divisor, rounding
    /// half away from zero.
    ///
    /// The numerator is `i128` because weighted averages multiply balances by
    /// costs before dividing.
    ///
    /// Returns `None` when `divisor` is not positive or the quotient does not
    /// fit in an `i64`.
    ///
    /// ## Example
    /// ```rust
    /// use kardex_core::money::Money;
    ///
    /// assert_eq!(Money::div_round(1600, 13).map(|m| m.cents()), Some(123));
    /// assert_eq!(Money::div_round(5, 2).map(|m| m.cents()), Some(3));
    /// assert_eq!(Money::div_round(-5, 2).map(|m| m.cents()), Some(-3));
    /// assert!(Money::div_round(100, 0).is_none());
    /// ```
    pub fn div_round(numerator: i128, divisor: i128) -> Option<Money> {
        if divisor <= 0 {
            return None;
        }
        let half = divisor / 2;
        let rounded = if numerator >= 0 {
            (numerator + half) / divisor
        } else {
            (numerator - half) / divisor
        };
        i64::try_from(rounded).ok().map(Money)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain two-decimal rendering, e.g. `10.99` or `-5.50`.
///
/// Currency symbols are left to the frontend.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
