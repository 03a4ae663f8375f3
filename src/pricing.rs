//! Installment simulator.
//!
//! The financed part of a purchase (price minus down payment) is multiplied by
//! `1 + rate`, where `rate` comes from the store's table for the chosen number
//! of installments, and split evenly. Amounts are rounded to cents half away
//! from zero.

use std::collections::BTreeMap;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::value_objects::Money;

/// Store policy for card installments.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InstallmentPolicy {
    /// Interest rate (fraction, `0.10` = 10%) per number of installments.
    pub rates: BTreeMap<u32, Decimal>,
    pub max_installments: u32,
    /// Options whose installment would fall below this amount are not offered.
    pub min_installment_value: Money,
}

impl Default for InstallmentPolicy {
    fn default() -> Self {
        let rates = [
            (1, 0), (2, 400), (3, 500), (4, 550), (5, 600), (6, 650),
            (7, 700), (8, 750), (9, 800), (10, 850), (11, 900), (12, 1000),
        ]
        .into_iter()
        .map(|(n, basis)| (n, Decimal::new(basis, 4)))
        .collect();
        Self { rates, max_installments: 12, min_installment_value: Money::from_cents(500) }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallmentQuote {
    pub installments: u32,
    pub rate: Decimal,
    pub price: Money,
    pub down_payment: Money,
    pub financed: Money,
    pub installment_value: Money,
    pub interest: Money,
    pub total: Money,
}

impl InstallmentQuote {
    pub fn is_interest_free(&self) -> bool { self.rate.is_zero() }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("price must be greater than zero")]
    InvalidPrice,
    #[error("down payment must be between zero and the price")]
    InvalidDownPayment,
    #[error("{0}x is not offered")]
    UnsupportedInstallments(u32),
    #[error("cost cannot be negative")]
    InvalidCost,
}

/// Margin of a product sold on the card, with the store absorbing the rate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MarginBreakdown {
    pub price: Money,
    pub cost: Money,
    pub installments: u32,
    pub margin: Money,
    pub margin_percent: Decimal,
    /// `None` when the cost is zero.
    pub markup_percent: Option<Decimal>,
    pub card_fee: Money,
    pub net_after_fee: Money,
    pub net_margin: Money,
}

fn percent(part: Decimal, whole: Decimal) -> Decimal {
    (part / whole * Decimal::ONE_HUNDRED).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

impl InstallmentPolicy {
    pub fn rate_for(&self, installments: u32) -> Result<Decimal, PricingError> {
        if installments == 0 || installments > self.max_installments {
            return Err(PricingError::UnsupportedInstallments(installments));
        }
        self.rates.get(&installments).copied().ok_or(PricingError::UnsupportedInstallments(installments))
    }

    pub fn simulate(&self, price: Money, down_payment: Money, installments: u32) -> Result<InstallmentQuote, PricingError> {
        if price.is_negative() || price.is_zero() { return Err(PricingError::InvalidPrice); }
        if down_payment.is_negative() || down_payment > price { return Err(PricingError::InvalidDownPayment); }
        let rate = self.rate_for(installments)?;
        let financed = price - down_payment;
        let financed_total = financed * (Decimal::ONE + rate);
        let installment_value = Money::new(financed_total.amount() / Decimal::from(installments)).round();
        let total = (down_payment + financed_total).round();
        Ok(InstallmentQuote {
            installments, rate, price, down_payment, financed: financed.round(), installment_value,
            interest: (financed_total - financed).round(), total,
        })
    }

    /// Every option of the table, skipping those below the minimum installment (1x is always kept).
    pub fn simulate_all(&self, price: Money, down_payment: Money) -> Result<Vec<InstallmentQuote>, PricingError> {
        let mut quotes = Vec::new();
        for &n in self.rates.keys().filter(|&&n| n >= 1 && n <= self.max_installments) {
            let quote = self.simulate(price, down_payment, n)?;
            if n == 1 || quote.installment_value >= self.min_installment_value {
                quotes.push(quote);
            }
        }
        Ok(quotes)
    }

    /// Amount the store keeps when it absorbs the rate instead of passing it on.
    pub fn net_if_absorbed(&self, price: Money, installments: u32) -> Result<Money, PricingError> {
        let rate = self.rate_for(installments)?;
        Ok((price * (Decimal::ONE - rate)).round())
    }

    pub fn margin_breakdown(&self, price: Money, cost: Money, installments: u32) -> Result<MarginBreakdown, PricingError> {
        if price.is_negative() || price.is_zero() { return Err(PricingError::InvalidPrice); }
        if cost.is_negative() { return Err(PricingError::InvalidCost); }
        let net_after_fee = self.net_if_absorbed(price, installments)?;
        let margin = price - cost;
        Ok(MarginBreakdown {
            price,
            cost,
            installments,
            margin,
            margin_percent: percent(margin.amount(), price.amount()),
            markup_percent: (!cost.is_zero()).then(|| percent(margin.amount(), cost.amount())),
            card_fee: price - net_after_fee,
            net_after_fee,
            net_margin: net_after_fee - cost,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(rate: Decimal) -> InstallmentPolicy {
        InstallmentPolicy { rates: (1..=12).map(|n| (n, rate)).collect(), ..InstallmentPolicy::default() }
    }

    #[test]
    fn test_twelve_installments_at_ten_percent() {
        let quote = flat(Decimal::new(10, 2)).simulate(Money::from_cents(100_000), Money::ZERO, 12).unwrap();
        assert_eq!(quote.total, Money::from_cents(110_000));
        assert_eq!(quote.installment_value, Money::from_cents(9167));
        assert_eq!(quote.interest, Money::from_cents(10_000));
    }

    #[test]
    fn test_down_payment_is_not_financed() {
        let quote = flat(Decimal::new(10, 2)).simulate(Money::from_cents(100_000), Money::from_cents(40_000), 3).unwrap();
        assert_eq!(quote.financed, Money::from_cents(60_000));
        assert_eq!(quote.installment_value, Money::from_cents(22_000));
        assert_eq!(quote.total, Money::from_cents(106_000));
    }

    #[test]
    fn test_single_payment_without_interest() {
        let quote = InstallmentPolicy::default().simulate(Money::from_cents(4990), Money::ZERO, 1).unwrap();
        assert!(quote.is_interest_free());
        assert_eq!(quote.total, Money::from_cents(4990));
    }

    #[test]
    fn test_input_validation() {
        let policy = InstallmentPolicy::default();
        assert_eq!(policy.simulate(Money::ZERO, Money::ZERO, 1), Err(PricingError::InvalidPrice));
        assert_eq!(policy.simulate(Money::from_cents(100), Money::from_cents(200), 1), Err(PricingError::InvalidDownPayment));
        assert_eq!(policy.simulate(Money::from_cents(100), Money::ZERO, 0), Err(PricingError::UnsupportedInstallments(0)));
        assert_eq!(policy.simulate(Money::from_cents(100), Money::ZERO, 13), Err(PricingError::UnsupportedInstallments(13)));
    }

    #[test]
    fn test_simulate_all_respects_minimum_installment() {
        // 30.00 split in more than 6x falls below the 5.00 minimum.
        let quotes = InstallmentPolicy::default().simulate_all(Money::from_cents(3000), Money::ZERO).unwrap();
        let counts: Vec<u32> = quotes.iter().map(|q| q.installments).collect();
        assert_eq!(counts, [1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_net_if_absorbed() {
        let policy = flat(Decimal::new(10, 2));
        assert_eq!(policy.net_if_absorbed(Money::from_cents(10_000), 12).unwrap(), Money::from_cents(9000));
    }

    #[test]
    fn test_margin_breakdown() {
        let m = InstallmentPolicy::default().margin_breakdown(Money::from_cents(10_000), Money::from_cents(6000), 12).unwrap();
        assert_eq!(m.margin, Money::from_cents(4000));
        assert_eq!(m.margin_percent, Decimal::new(4000, 2));
        assert_eq!(m.markup_percent, Some(Decimal::new(6667, 2)));
        assert_eq!(m.card_fee, Money::from_cents(1000));
        assert_eq!(m.net_margin, Money::from_cents(3000));

        let free = InstallmentPolicy::default().margin_breakdown(Money::from_cents(5000), Money::ZERO, 1).unwrap();
        assert_eq!(free.markup_percent, None);
        assert_eq!(free.card_fee, Money::ZERO);
    }
}
