//! Money value object backed by exact decimal arithmetic.
//!
//! All monetary amounts in the system are EUR with two decimal places. The
//! card gateway works exclusively in integer cents, so the conversion in
//! [`Money::as_cents`] must be bit-exact with its inverse
//! [`Money::from_cents`]: half-cent values round away from zero, matching the
//! gateway's own rounding of decimal inputs.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub};

use super::errors::{DomainError, ErrorCode};

/// An exact EUR amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// A zero amount.
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Creates an amount from a decimal value.
    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Creates a non-negative amount, rejecting negative inputs.
    pub fn non_negative(amount: Decimal) -> Result<Self, DomainError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(DomainError::new(
                ErrorCode::NegativeAmount,
                format!("Amount must not be negative, got {}", amount),
            ));
        }
        Ok(Self(amount))
    }

    /// Creates an amount from integer cents.
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, 2))
    }

    /// Converts the amount to integer cents.
    ///
    /// Rounds half away from zero: 10.005 EUR becomes 1001 cents. This is the
    /// exact inverse of [`Money::from_cents`] for any two-decimal amount.
    pub fn as_cents(&self) -> i64 {
        let cents = (self.0 * Decimal::new(100, 0))
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        // Two-decimal EUR amounts within any realistic order total fit i64.
        cents.to_i64().unwrap_or(0)
    }

    /// Returns the inner decimal.
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// True if the amount is strictly negative.
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// True if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns `percentage`% of this amount, rounded to whole cents
    /// (half away from zero).
    pub fn percentage(&self, percentage: Decimal) -> Money {
        let raw = self.0 * percentage / Decimal::new(100, 0);
        Money(raw.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}
