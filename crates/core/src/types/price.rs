//! Fixed-point money amounts.
//!
//! The shop trades in a single currency, so a price is just a non-negative
//! [`Decimal`] kept at exactly two fractional digits. Every arithmetic result is
//! rounded back to two places with round-half-up (midpoint away from zero;
//! amounts are never negative, so the two coincide).

use core::fmt;
use core::iter::Sum;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors that can occur when building a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is below zero.
    #[error("price cannot be negative")]
    Negative,
    /// The amount has more than two fractional digits.
    #[error("price must have at most {max} fractional digits")]
    TooPrecise {
        /// Maximum allowed scale.
        max: u32,
    },
    /// The amount does not fit the `NUMERIC(9, 2)` column.
    #[error("price must be below {max}")]
    TooLarge {
        /// Exclusive upper bound.
        max: Decimal,
    },
    /// The input is not a decimal number.
    #[error("invalid price: {0}")]
    Invalid(String),
    /// An arithmetic operation overflowed.
    #[error("price arithmetic overflowed")]
    Overflow,
}

/// A non-negative amount with two fractional digits.
///
/// ## Examples
///
/// ```
/// use gadget_shop_core::Price;
///
/// let price = Price::parse("599.99").unwrap();
/// assert_eq!(price.times(2).unwrap().to_string(), "1199.98");
/// assert!(Price::parse("-1").is_err());
/// assert!(Price::parse("1.005").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Number of fractional digits every price carries.
    pub const SCALE: u32 = 2;

    /// Zero.
    pub const ZERO: Self = Self(Decimal::from_parts(0, 0, 0, false, Self::SCALE));

    /// Largest stored amount (`NUMERIC(9, 2)`), exclusive.
    const MAX_DIGITS: u32 = 9;

    /// Build a price from a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is negative, has more than two
    /// fractional digits, or needs more than nine digits in total.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        let normalized = amount.normalize();
        if normalized.scale() > Self::SCALE {
            return Err(PriceError::TooPrecise { max: Self::SCALE });
        }
        let max = Self::upper_bound();
        if amount >= max {
            return Err(PriceError::TooLarge { max });
        }
        Ok(Self::rescaled(amount))
    }

    /// Build an aggregate amount such as a cart or order total.
    ///
    /// Unlike [`Price::new`] there is no upper bound: totals may exceed the
    /// price of any single product.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is negative or has more than two
    /// fractional digits.
    pub fn total(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        if amount.normalize().scale() > Self::SCALE {
            return Err(PriceError::TooPrecise { max: Self::SCALE });
        }
        Ok(Self::rescaled(amount))
    }

    /// Serde `deserialize_with` helper for total fields.
    ///
    /// # Errors
    ///
    /// Fails for input that is not a decimal or that [`Price::total`] rejects.
    pub fn deserialize_total<'de, D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let amount = <Decimal as Deserialize>::deserialize(deserializer)?;
        Self::total(amount).map_err(serde::de::Error::custom)
    }

    /// Build a price from a whole number of cents.
    ///
    /// # Errors
    ///
    /// Returns an error if `cents` is negative or too large.
    pub fn from_cents(cents: i64) -> Result<Self, PriceError> {
        Self::new(Decimal::new(cents, Self::SCALE))
    }

    /// Parse a price from its decimal string form.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a decimal or violates the
    /// constraints of [`Price::new`].
    pub fn parse(s: &str) -> Result<Self, PriceError> {
        let amount: Decimal = s
            .trim()
            .parse()
            .map_err(|e: rust_decimal::Error| PriceError::Invalid(e.to_string()))?;
        Self::new(amount)
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns `true` for a zero amount.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Multiply by a quantity, rounding half-up to two places.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Overflow`] if the product does not fit.
    pub fn times(self, quantity: u32) -> Result<Self, PriceError> {
        self.0
            .checked_mul(Decimal::from(quantity))
            .map(Self::rescaled)
            .ok_or(PriceError::Overflow)
    }

    /// Add two prices.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Overflow`] if the sum does not fit.
    pub fn checked_add(self, other: Self) -> Result<Self, PriceError> {
        self.0
            .checked_add(other.0)
            .map(Self::rescaled)
            .ok_or(PriceError::Overflow)
    }

    fn rescaled(amount: Decimal) -> Self {
        let mut rounded =
            amount.round_dp_with_strategy(Self::SCALE, RoundingStrategy::MidpointAwayFromZero);
        rounded.rescale(Self::SCALE);
        Self(rounded)
    }

    fn upper_bound() -> Decimal {
        Decimal::from(10_i64.pow(Self::MAX_DIGITS - Self::SCALE))
    }
}

impl Default for Price {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl std::str::FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::new(amount)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

/// Sums without the `NUMERIC(9, 2)` bound: cart totals may exceed a single
/// product price.
impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, p| Self::rescaled(acc.0 + p.0))
    }
}

impl<'a> Sum<&'a Self> for Price {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// SQLx support (with postgres feature)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Price {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Price {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        // NUMERIC(9, 2) columns can still hold negatives; reject them here
        Ok(Self::new(amount)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Price {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
