use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const DEFAULT_CURRENCY: &str = "AED";

/// The platform commission on every escrowed amount, in basis points (18%).
pub const PLATFORM_FEE_BPS: i64 = 1800;

/// Currencies whose minor unit is one-thousandth of the major unit. Everything else uses the usual
/// one-hundredth minor unit.
const THREE_DECIMAL_CURRENCIES: [&str; 7] = ["BHD", "IQD", "JOD", "KWD", "LYD", "OMR", "TND"];

pub fn is_three_decimal_currency(code: &str) -> bool {
    THREE_DECIMAL_CURRENCIES.iter().any(|c| c.eq_ignore_ascii_case(code))
}

//--------------------------------------       Money       -----------------------------------------------------------
/// A monetary amount in thousandths of a major currency unit.
///
/// Storing amounts at 1/1000 precision lets the same representation round-trip losslessly through
/// both two-decimal and three-decimal gateway minor units.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Money(i64);

op!(binary Money, Add, add);
op!(binary Money, Sub, sub);
op!(inplace Money, SubAssign, sub_assign);
op!(unary Money, Neg, neg);

impl Mul<i64> for Money {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as a monetary amount: {0}")]
pub struct MoneyConversionError(String);

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Money {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Money {}

impl TryFrom<u64> for Money {
    type Error = MoneyConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(MoneyConversionError(format!("Value {} is too large to convert to Money", value)))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let major = self.0 as f64 / 1000.0;
        write!(f, "{major:0.3}")
    }
}

impl Money {
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Constructs an amount from whole major currency units.
    pub fn from_major(units: i64) -> Self {
        Self(units * 1000)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// The platform's 18% cut of this amount, truncated to the nearest thousandth.
    pub fn platform_fee(&self) -> Self {
        Self(self.0 * PLATFORM_FEE_BPS / 10_000)
    }

    /// What the worker receives after the platform fee. `platform_fee() + worker_payout()` always
    /// equals the original amount exactly.
    pub fn worker_payout(&self) -> Self {
        *self - self.platform_fee()
    }

    /// Converts the amount to the gateway's minor-unit representation for the given currency.
    /// Three-decimal currencies keep the full 1/1000 precision; two-decimal currencies are rounded
    /// to the nearest 1/100.
    pub fn to_minor_units(&self, currency: &str) -> i64 {
        if is_three_decimal_currency(currency) {
            self.0
        } else {
            let (q, r) = (self.0 / 10, self.0 % 10);
            if r.abs() >= 5 {
                q + r.signum()
            } else {
                q
            }
        }
    }

    /// Converts a gateway minor-unit amount back to major-unit `Money`.
    pub fn from_minor_units(minor: i64, currency: &str) -> Self {
        if is_three_decimal_currency(currency) {
            Self(minor)
        } else {
            Self(minor * 10)
        }
    }
}
