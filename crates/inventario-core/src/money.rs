//! # Prices in Cents
//!
//! ## Storage Boundary
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Request "150.50" ──► Money::parse ──► Money(15050 cents)               │
//! │                                            │                            │
//! │                                            ▼                            │
//! │  SQLite REAL 150.5 ◄──── as_stored() ──────┘                           │
//! │        │                                                                │
//! │        └── CAST(ROUND(CAST(precio AS REAL) * 100) AS INTEGER)          │
//! │                 ──► price_cents on every row type                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The inventory database predates this service and keeps prices as `REAL`
//! (sometimes as text). All arithmetic here happens on integer cents; the
//! float only exists at the two conversion points.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use ts_rs::TS;

use crate::error::ValidationError;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use inventario_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Parses a user-entered price.
    ///
    /// ## Rules
    /// - Surrounding whitespace is ignored
    /// - Must parse as a finite number
    /// - Must not be negative (zero is allowed)
    /// - Rounded to the nearest cent
    ///
    /// ## Example
    /// ```rust
    /// use inventario_core::money::Money;
    ///
    /// assert_eq!(Money::parse(" 150.50 ").unwrap().cents(), 15050);
    /// assert!(Money::parse("abc").is_err());
    /// assert!(Money::parse("-1").is_err());
    /// ```
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        let value: f64 = trimmed.parse().map_err(|_| ValidationError::InvalidPrice {
            value: trimmed.to_string(),
        })?;
        Money::from_major(value).ok_or_else(|| ValidationError::InvalidPrice {
            value: trimmed.to_string(),
        })
    }

    /// Converts a decimal amount in major units.
    ///
    /// Returns `None` for NaN, infinities and negative amounts.
    pub fn from_major(value: f64) -> Option<Self> {
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        let cents = (value * 100.0).round();
        if cents > i64::MAX as f64 {
            return None;
        }
        Some(Money(cents as i64))
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the value as stored in the legacy `REAL` price columns.
    #[inline]
    pub fn as_stored(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Adds two amounts, `None` when the sum leaves the `i64` range.
    ///
    /// Checkout totals go through here; `+` saturates and is meant for
    /// reports over already-stored prices.
    #[inline]
    pub const fn checked_add(self, other: Money) -> Option<Money> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Sums optional cent amounts, counting missing values as zero.
    ///
    /// Reports treat a sold item without a readable price as free.
    pub fn sum_cents<I>(values: I) -> Money
    where
        I: IntoIterator<Item = Option<i64>>,
    {
        values.into_iter().map(|c| Money(c.unwrap_or(0))).sum()
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}${}.{:02}", sign, (self.0 / 100).abs(), (self.0 % 100).abs())
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
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
