//! Value objects shared by every aggregate.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Sub};
use thiserror::Error;

/// Tenant identifier. Every document is scoped by one.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StoreId(String);

impl StoreId {
    pub fn new(value: impl Into<String>) -> Result<Self, StoreIdError> {
        let value = value.into().trim().to_lowercase();
        if value.is_empty() { return Err(StoreIdError::Empty); }
        if value.len() > 64 { return Err(StoreIdError::TooLong); }
        if !value.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_') {
            return Err(StoreIdError::InvalidCharacter);
        }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl TryFrom<String> for StoreId {
    type Error = StoreIdError;
    fn try_from(value: String) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<StoreId> for String {
    fn from(id: StoreId) -> Self { id.0 }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreIdError {
    #[error("store id is empty")]
    Empty,
    #[error("store id is longer than 64 characters")]
    TooLong,
    #[error("store id may only contain a-z, 0-9, '-' and '_'")]
    InvalidCharacter,
}

/// SKU (Stock Keeping Unit) value object
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sku(String);

impl Sku {
    pub fn new(value: impl Into<String>) -> Result<Self, SkuError> {
        let value = value.into().trim().to_uppercase();
        if value.is_empty() { return Err(SkuError::Empty); }
        if value.len() > 50 { return Err(SkuError::TooLong); }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Sku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl TryFrom<String> for Sku {
    type Error = SkuError;
    fn try_from(value: String) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Sku> for String {
    fn from(sku: Sku) -> Self { sku.0 }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SkuError {
    #[error("SKU empty")]
    Empty,
    #[error("SKU too long")]
    TooLong,
}

/// Amount in the store currency. Totals are kept at two decimal places.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self { Self(amount) }
    /// Builds an amount from integer cents, e.g. `from_cents(1999)` is 19.99.
    pub fn from_cents(cents: i64) -> Self { Self(Decimal::new(cents, 2)) }
    pub fn amount(&self) -> Decimal { self.0 }
    pub fn is_negative(&self) -> bool { self.0.is_sign_negative() && !self.0.is_zero() }
    pub fn is_zero(&self) -> bool { self.0.is_zero() }

    /// Rounds half away from zero to cents.
    pub fn round(&self) -> Money {
        Money(self.0.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }

    pub fn multiply(&self, qty: u32) -> Money { Money(self.0 * Decimal::from(qty)) }

    /// `self * rate`; `scale(Decimal::new(10, 2))` is ten percent.
    pub fn scale(&self, rate: Decimal) -> Money { Money(self.0 * rate) }

    /// Subtraction clamped at zero.
    pub fn saturating_sub(self, other: Money) -> Money {
        if other >= self { Money::ZERO } else { Money(self.0 - other.0) }
    }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money { Money(self.0 + rhs.0) }
}

impl Sub for Money {
    type Output = Money;
    fn sub(self, rhs: Money) -> Money { Money(self.0 - rhs.0) }
}

impl Mul<Decimal> for Money {
    type Output = Money;
    fn mul(self, rhs: Decimal) -> Money { Money(self.0 * rhs) }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money { iter.fold(Money::ZERO, |acc, m| acc + m) }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self { Self(amount) }
}

/// Quantity value object
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(u32);

impl Quantity {
    pub fn new(value: u32) -> Self { Self(value) }
    pub fn value(&self) -> u32 { self.0 }
    pub fn add(&self, other: u32) -> Self { Self(self.0.saturating_add(other)) }
    pub fn subtract(&self, other: u32) -> Option<Self> {
        if other > self.0 { None } else { Some(Self(self.0 - other)) }
    }
    /// Applies a signed adjustment; `None` when the result would go below zero.
    pub fn adjust(&self, delta: i64) -> Option<Self> {
        let next = i64::from(self.0).checked_add(delta)?;
        u32::try_from(next).ok().map(Self)
    }
    pub fn is_zero(&self) -> bool { self.0 == 0 }
}

/// Phone number in the digits-only international form used by wa.me links.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WhatsAppNumber(String);

/// Country code prefixed to national numbers (10 or 11 digits).
const DEFAULT_COUNTRY_CODE: &str = "55";

impl WhatsAppNumber {
    pub fn new(value: impl AsRef<str>) -> Result<Self, PhoneError> {
        let digits: String = value.as_ref().chars().filter(char::is_ascii_digit).collect();
        let digits = match digits.len() {
            0 => return Err(PhoneError::Empty),
            10 | 11 => format!("{DEFAULT_COUNTRY_CODE}{digits}"),
            _ => digits,
        };
        if !(12..=15).contains(&digits.len()) { return Err(PhoneError::InvalidLength(digits.len())); }
        Ok(Self(digits))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for WhatsAppNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl TryFrom<String> for WhatsAppNumber {
    type Error = PhoneError;
    fn try_from(value: String) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<WhatsAppNumber> for String {
    fn from(n: WhatsAppNumber) -> Self { n.0 }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PhoneError {
    #[error("phone number is empty")]
    Empty,
    #[error("phone number has {0} digits, expected 10 to 15")]
    InvalidLength(usize),
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_sku() { let sku = Sku::new("prod-001").unwrap(); assert_eq!(sku.as_str(), "PROD-001"); }
    #[test]
    fn test_store_id_rules() {
        assert_eq!(StoreId::new(" Loja-Centro ").unwrap().as_str(), "loja-centro");
        assert_eq!(StoreId::new("").unwrap_err(), StoreIdError::Empty);
        assert_eq!(StoreId::new("a b").unwrap_err(), StoreIdError::InvalidCharacter);
        assert_eq!(StoreId::new("x".repeat(65)).unwrap_err(), StoreIdError::TooLong);
    }
    #[test]
    fn test_money_round_half_away() {
        assert_eq!(Money::new(Decimal::new(916_665, 4)).round(), Money::from_cents(9167));
        assert_eq!(Money::new(Decimal::new(125, 3)).round(), Money::from_cents(13));
    }
    #[test]
    fn test_money_saturating_sub() {
        assert_eq!(Money::from_cents(500).saturating_sub(Money::from_cents(800)), Money::ZERO);
        assert_eq!(Money::from_cents(800) - Money::from_cents(500), Money::from_cents(300));
    }
    #[test]
    fn test_quantity_adjust() {
        let q = Quantity::new(3);
        assert_eq!(q.adjust(-3), Some(Quantity::new(0)));
        assert_eq!(q.adjust(-4), None);
        assert_eq!(q.adjust(2), Some(Quantity::new(5)));
    }
    #[test]
    fn test_whatsapp_number_normalization() {
        assert_eq!(WhatsAppNumber::new("(11) 98765-4321").unwrap().as_str(), "5511987654321");
        assert_eq!(WhatsAppNumber::new("+55 11 98765-4321").unwrap().as_str(), "5511987654321");
        assert_eq!(WhatsAppNumber::new("123").unwrap_err(), PhoneError::InvalidLength(3));
        assert_eq!(WhatsAppNumber::new("abc").unwrap_err(), PhoneError::Empty);
    }
}
