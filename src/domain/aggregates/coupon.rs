//! Coupon Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::domain::value_objects::Money;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Coupon {
    /// Upper-cased code; doubles as the document id.
    pub code: String,
    pub discount: Discount,
    #[serde(default)]
    pub min_purchase: Option<Money>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub usage_limit: Option<u32>,
    #[serde(default)]
    pub used_count: u32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Discount {
    /// Percentage in (0, 100].
    Percentage(Decimal),
    Fixed(Money),
}

#[derive(Clone, Debug, Deserialize)]
pub struct CouponInput {
    pub code: String,
    pub discount: Discount,
    #[serde(default)]
    pub min_purchase: Option<Money>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub usage_limit: Option<u32>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool { true }

impl Coupon {
    pub fn create(input: CouponInput) -> Result<Self, CouponError> {
        let code = normalize_code(&input.code);
        if code.is_empty() || code.len() > 32 { return Err(CouponError::InvalidCode); }
        match input.discount {
            Discount::Percentage(p) if p <= Decimal::ZERO || p > Decimal::ONE_HUNDRED => return Err(CouponError::InvalidDiscount),
            Discount::Fixed(m) if m.is_negative() || m.is_zero() => return Err(CouponError::InvalidDiscount),
            _ => {}
        }
        Ok(Self {
            code, discount: input.discount, min_purchase: input.min_purchase, expires_at: input.expires_at,
            usage_limit: input.usage_limit, used_count: 0, active: input.active, created_at: Utc::now(),
        })
    }

    /// Discount granted on `subtotal` at `now`; never more than the subtotal.
    pub fn discount_for(&self, subtotal: Money, now: DateTime<Utc>) -> Result<Money, CouponError> {
        if !self.active { return Err(CouponError::Inactive); }
        if self.expires_at.is_some_and(|at| at <= now) { return Err(CouponError::Expired); }
        if self.usage_limit.is_some_and(|limit| self.used_count >= limit) { return Err(CouponError::Exhausted); }
        if let Some(min) = self.min_purchase {
            if subtotal < min { return Err(CouponError::BelowMinimum(min)); }
        }
        let discount = match self.discount {
            Discount::Percentage(p) => subtotal.scale(p / Decimal::ONE_HUNDRED).round(),
            Discount::Fixed(amount) => amount,
        };
        Ok(discount.min(subtotal))
    }

    pub fn redeem(&mut self) { self.used_count = self.used_count.saturating_add(1); }

    /// Gives back a redemption, e.g. when the sale that used it is cancelled.
    pub fn release(&mut self) { self.used_count = self.used_count.saturating_sub(1); }
}

pub fn normalize_code(code: &str) -> String { code.trim().to_uppercase() }

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CouponError {
    #[error("Invalid coupon code")]
    InvalidCode,
    #[error("Discount must be a percentage in (0, 100] or a positive amount")]
    InvalidDiscount,
    #[error("Coupon not found")]
    NotFound,
    #[error("Coupon is inactive")]
    Inactive,
    #[error("Coupon has expired")]
    Expired,
    #[error("Coupon usage limit reached")]
    Exhausted,
    #[error("Minimum purchase of {} not reached", .0.amount())]
    BelowMinimum(Money),
}
