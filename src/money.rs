//! Fixed-point money.
//!
//! All prices and totals are carried as integer cents. Decimal values only
//! appear at the JSON boundary, where they are rounded half away from zero
//! to two places.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};

use crate::error::MarketError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Cents(i64);

impl Cents {
    pub const ZERO: Cents = Cents(0);

    pub const fn new(minor_units: i64) -> Self {
        Cents(minor_units)
    }

    pub const fn minor_units(self) -> i64 {
        self.0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Convert a decimal amount (e.g. `25.99`) into cents.
    pub fn from_decimal(value: Decimal) -> Result<Self, MarketError> {
        let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        rounded.rescale(2);
        i64::try_from(rounded.mantissa())
            .map(Cents)
            .map_err(|_| MarketError::validation(format!("Amount out of range: {}", value)))
    }

    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    pub fn saturating_mul(self, quantity: u32) -> Self {
        Cents(self.0.saturating_mul(i64::from(quantity)))
    }

    /// Multiply by a rate given in basis points (800 = 8%), rounding to the
    /// nearest cent, halves away from zero.
    pub fn apply_basis_points(self, basis_points: i64) -> Self {
        let scaled = i128::from(self.0) * i128::from(basis_points);
        let quotient = scaled / 10_000;
        let remainder = scaled % 10_000;
        let carry = if remainder.abs() * 2 >= 10_000 {
            scaled.signum()
        } else {
            0
        };
        Cents((quotient + carry) as i64)
    }
}

impl Add for Cents {
    type Output = Cents;

    fn add(self, rhs: Cents) -> Cents {
        Cents(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Cents {
    type Output = Cents;

    fn sub(self, rhs: Cents) -> Cents {
        Cents(self.0.saturating_sub(rhs.0))
    }
}

impl Sum for Cents {
    fn sum<I: Iterator<Item = Cents>>(iter: I) -> Cents {
        iter.fold(Cents::ZERO, |acc, c| acc + c)
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl Serialize for Cents {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        rust_decimal::serde::float::serialize(&self.to_decimal(), serializer)
    }
}

impl<'de> Deserialize<'de> for Cents {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = rust_decimal::serde::float::deserialize(deserializer)?;
        Cents::from_decimal(value).map_err(de::Error::custom)
    }
}
