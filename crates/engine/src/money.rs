//! Fixed-point amounts.
//!
//! Every amount the ledger stores or moves is a whole number of cents. Rows
//! hold non-negative amounts; signed values only show up as balance deltas
//! and as the profit of an investment. Ratios leave this type through
//! [`Money::to_decimal`].

use std::{
    fmt,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};

use crate::EngineError;

/// An amount in cents.
///
/// ```rust
/// use engine::Money;
///
/// let rent: Money = "1250,5".parse().unwrap();
/// assert_eq!(rent, Money::new(125_050));
/// assert_eq!(rent.to_string(), "1250.50");
/// assert!("3.999".parse::<Money>().is_err());
/// ```
///
/// The operators do not check for overflow. Ledger code accumulates with
/// [`Money::checked_add`] and [`Money::checked_sum`].
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    #[must_use]
    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    /// `units` whole currency units, e.g. `Money::units(5)` is `5.00`.
    #[must_use]
    pub const fn units(units: i64) -> Self {
        Self(units * 100)
    }

    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    #[must_use]
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    #[must_use]
    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }

    /// Sum of `amounts`, or `None` as soon as it leaves the `i64` range.
    #[must_use]
    pub fn checked_sum<I>(amounts: I) -> Option<Money>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts.into_iter().try_fold(Money::ZERO, Money::checked_add)
    }

    /// Exact decimal value (scale 2).
    #[must_use]
    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Converts a decimal with at most two fractional digits.
    fn from_decimal(value: Decimal) -> Result<Self, EngineError> {
        if value.normalize().scale() > 2 {
            return Err(EngineError::Validation(
                "amounts have at most two decimals".to_string(),
            ));
        }
        value
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|cents| cents.to_i64())
            .map(Money)
            .ok_or_else(|| EngineError::Validation("amount too large".to_string()))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl From<Money> for i64 {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Self::Output {
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

    fn sub(self, rhs: Money) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Self::Output {
        Money(-self.0)
    }
}

impl FromStr for Money {
    type Err = EngineError;

    /// Parses user input such as `12`, `12.5`, `-0,01` or `+3.00`.
    ///
    /// A comma is read as the decimal point. Digits are required before it;
    /// thousands separators and exponents are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || EngineError::Validation(format!("invalid amount '{}'", s.trim()));

        let trimmed = s.trim();
        let (negative, digits) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };
        let digits = digits.replace(',', ".");
        let integral = digits.split('.').next().unwrap_or_default();
        if integral.is_empty()
            || digits.matches('.').count() > 1
            || !digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        {
            return Err(invalid());
        }

        let value = Decimal::from_str(&digits).map_err(|_| invalid())?;
        Self::from_decimal(if negative { -value } else { value })
    }
}
