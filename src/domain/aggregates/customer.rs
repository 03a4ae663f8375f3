//! Customer Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;
use crate::domain::value_objects::{Money, WhatsAppNumber};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: Option<WhatsAppNumber>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub purchases: u32,
    pub total_spent: Money,
    pub last_purchase_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, Deserialize, Validate)]
pub struct CustomerInput {
    #[validate(length(min = 1, max = 120, message = "name is required"))]
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    #[validate(email)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Customer {
    pub fn create(input: &CustomerInput) -> Result<Self, CustomerError> {
        let mut customer = Self {
            id: Uuid::now_v7().to_string(), name: String::new(), phone: None, email: None,
            address: None, notes: None, purchases: 0, total_spent: Money::ZERO,
            last_purchase_at: None, created_at: Utc::now(),
        };
        customer.update(input)?;
        Ok(customer)
    }

    pub fn update(&mut self, input: &CustomerInput) -> Result<(), CustomerError> {
        input.validate().map_err(|e| CustomerError::Invalid(e.to_string()))?;
        let name = input.name.trim();
        if name.is_empty() { return Err(CustomerError::MissingName); }
        self.phone = match input.phone.as_deref().map(str::trim) {
            Some(p) if !p.is_empty() => Some(WhatsAppNumber::new(p).map_err(|e| CustomerError::Invalid(e.to_string()))?),
            _ => None,
        };
        self.name = name.to_string();
        self.email = input.email.clone().filter(|e| !e.is_empty());
        self.address = input.address.clone();
        self.notes = input.notes.clone();
        Ok(())
    }

    pub fn record_purchase(&mut self, amount: Money, at: DateTime<Utc>) {
        self.purchases += 1;
        self.total_spent = (self.total_spent + amount).round();
        self.last_purchase_at = Some(at);
    }

    /// Reverts a purchase recorded for a sale that got cancelled.
    pub fn revert_purchase(&mut self, amount: Money) {
        self.purchases = self.purchases.saturating_sub(1);
        self.total_spent = self.total_spent.saturating_sub(amount);
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CustomerError {
    #[error("Missing name")]
    MissingName,
    #[error("Invalid customer: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_customer_phone_normalized() {
        let c = Customer::create(&CustomerInput { name: "Ana".into(), phone: Some("(21) 99999-0000".into()), ..Default::default() }).unwrap();
        assert_eq!(c.phone.unwrap().as_str(), "5521999990000");
    }
    #[test]
    fn test_invalid_email_rejected() {
        let err = Customer::create(&CustomerInput { name: "Ana".into(), email: Some("nope".into()), ..Default::default() }).unwrap_err();
        assert!(matches!(err, CustomerError::Invalid(_)));
    }
    #[test]
    fn test_purchase_stats() {
        let mut c = Customer::create(&CustomerInput { name: "Ana".into(), ..Default::default() }).unwrap();
        c.record_purchase(Money::from_cents(1000), Utc::now());
        c.record_purchase(Money::from_cents(550), Utc::now());
        assert_eq!(c.purchases, 2);
        assert_eq!(c.total_spent, Money::from_cents(1550));
        c.revert_purchase(Money::from_cents(550));
        assert_eq!(c.total_spent, Money::from_cents(1000));
    }
}
