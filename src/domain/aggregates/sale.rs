//! Sale Aggregate
//!
//! A sale is either rung up at the counter (PDV) or placed through the
//! storefront checkout. Online sales stay pending until the store confirms
//! them over WhatsApp; stock moves only when a sale is completed.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use crate::domain::value_objects::Money;
use crate::domain::events::{DomainEvent, SaleEvent};
use crate::pricing::InstallmentQuote;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Sale {
    id: String,
    number: u64,
    channel: SaleChannel,
    status: SaleStatus,
    items: Vec<SaleItem>,
    subtotal: Money,
    discount: Money,
    total: Money,
    payment: PaymentMethod,
    installment_quote: Option<InstallmentQuote>,
    cash_received: Option<Money>,
    change: Option<Money>,
    coupon_code: Option<String>,
    customer_id: Option<String>,
    customer_name: Option<String>,
    seller_id: Option<String>,
    delivery: Option<Delivery>,
    notes: Option<String>,
    /// Whether stock was taken for this sale (restocked on cancel).
    stock_applied: bool,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleItem {
    pub product_id: String,
    pub name: String,
    pub sku: Option<String>,
    pub option: Option<String>,
    pub quantity: u32,
    pub unit_price: Money,
    pub total: Money,
}

impl SaleItem {
    pub fn new(product_id: impl Into<String>, name: impl Into<String>, sku: Option<String>, option: Option<String>, quantity: u32, unit_price: Money) -> Self {
        Self {
            product_id: product_id.into(), name: name.into(), sku, option, quantity, unit_price,
            total: unit_price.multiply(quantity).round(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaleChannel { #[default] Pdv, Online }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus { #[default] Pending, Completed, Cancelled }

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PaymentMethod {
    Pix,
    Cash {
        /// Customer asked for change for this amount (online orders).
        #[serde(default)]
        change_for: Option<Money>,
    },
    Debit,
    Credit { installments: u32 },
}

impl PaymentMethod {
    pub fn label(&self) -> String {
        match self {
            Self::Pix => "Pix".to_string(),
            Self::Cash { .. } => "Dinheiro".to_string(),
            Self::Debit => "Cartão de débito".to_string(),
            Self::Credit { installments } if *installments <= 1 => "Cartão de crédito à vista".to_string(),
            Self::Credit { installments } => format!("Cartão de crédito em {installments}x"),
        }
    }
    /// Key used when grouping totals by payment method.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Pix => "pix",
            Self::Cash { .. } => "cash",
            Self::Debit => "debit",
            Self::Credit { .. } => "credit",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Delivery {
    Pickup,
    Address { address: String },
}

impl Sale {
    pub fn create(channel: SaleChannel, payment: PaymentMethod) -> Self {
        let id = Uuid::now_v7().to_string();
        let now = Utc::now();
        let number = Self::next_number(now);
        let mut sale = Self {
            id: id.clone(), number, channel, status: SaleStatus::Pending, items: vec![],
            subtotal: Money::ZERO, discount: Money::ZERO, total: Money::ZERO, payment,
            installment_quote: None, cash_received: None, change: None, coupon_code: None,
            customer_id: None, customer_name: None, seller_id: None, delivery: None, notes: None,
            stock_applied: false, created_at: now, completed_at: None, updated_at: now, events: vec![],
        };
        sale.raise_event(DomainEvent::Sale(SaleEvent::Created { sale_id: id, number }));
        sale
    }

    /// Date-prefixed number, e.g. `202410161234` (yyyymmdd + 4 random digits).
    fn next_number(now: DateTime<Utc>) -> u64 {
        let date: u64 = now.format("%Y%m%d").to_string().parse().unwrap_or(0);
        date * 10_000 + rand::thread_rng().gen_range(0..10_000)
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn number(&self) -> u64 { self.number }
    pub fn channel(&self) -> SaleChannel { self.channel }
    pub fn status(&self) -> SaleStatus { self.status }
    pub fn items(&self) -> &[SaleItem] { &self.items }
    pub fn subtotal(&self) -> Money { self.subtotal }
    pub fn discount(&self) -> Money { self.discount }
    pub fn total(&self) -> Money { self.total }
    pub fn payment(&self) -> &PaymentMethod { &self.payment }
    pub fn installment_quote(&self) -> Option<&InstallmentQuote> { self.installment_quote.as_ref() }
    pub fn cash_received(&self) -> Option<Money> { self.cash_received }
    pub fn change(&self) -> Option<Money> { self.change }
    pub fn coupon_code(&self) -> Option<&str> { self.coupon_code.as_deref() }
    pub fn customer_id(&self) -> Option<&str> { self.customer_id.as_deref() }
    pub fn customer_name(&self) -> Option<&str> { self.customer_name.as_deref() }
    pub fn seller_id(&self) -> Option<&str> { self.seller_id.as_deref() }
    pub fn delivery(&self) -> Option<&Delivery> { self.delivery.as_ref() }
    pub fn notes(&self) -> Option<&str> { self.notes.as_deref() }
    pub fn stock_applied(&self) -> bool { self.stock_applied }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn completed_at(&self) -> Option<DateTime<Utc>> { self.completed_at }

    pub fn add_item(&mut self, item: SaleItem) -> Result<(), SaleError> {
        self.ensure_pending()?;
        if item.quantity == 0 { return Err(SaleError::InvalidQuantity); }
        self.items.push(item);
        self.recalculate();
        Ok(())
    }

    /// Discount on the subtotal, capped at the subtotal.
    pub fn apply_discount(&mut self, discount: Money, coupon_code: Option<String>) -> Result<(), SaleError> {
        self.ensure_pending()?;
        if discount.is_negative() { return Err(SaleError::InvalidDiscount); }
        self.discount = discount;
        self.coupon_code = coupon_code;
        self.recalculate();
        Ok(())
    }

    /// Replaces the total with the financed total of a credit card quote.
    pub fn set_installment_quote(&mut self, quote: InstallmentQuote) {
        self.installment_quote = Some(quote);
        self.recalculate();
    }

    pub fn set_customer(&mut self, id: Option<String>, name: Option<String>) { self.customer_id = id; self.customer_name = name; self.touch(); }
    pub fn set_seller(&mut self, seller_id: Option<String>) { self.seller_id = seller_id; self.touch(); }
    pub fn set_delivery(&mut self, delivery: Option<Delivery>) { self.delivery = delivery; self.touch(); }
    pub fn set_notes(&mut self, notes: Option<String>) { self.notes = notes.filter(|n| !n.trim().is_empty()); self.touch(); }

    /// Records cash handed over at the counter and the change due.
    pub fn receive_cash(&mut self, received: Money) -> Result<Money, SaleError> {
        if !matches!(self.payment, PaymentMethod::Cash { .. }) { return Err(SaleError::NotCash); }
        if received < self.total { return Err(SaleError::InsufficientPayment { total: self.total, received }); }
        let change = (received - self.total).round();
        self.cash_received = Some(received);
        self.change = Some(change);
        self.touch();
        Ok(change)
    }

    pub fn mark_stock_applied(&mut self, applied: bool) { self.stock_applied = applied; self.touch(); }

    pub fn complete(&mut self) -> Result<(), SaleError> {
        self.ensure_pending()?;
        if self.items.is_empty() { return Err(SaleError::NoItems); }
        self.status = SaleStatus::Completed;
        self.completed_at = Some(Utc::now());
        self.touch();
        self.raise_event(DomainEvent::Sale(SaleEvent::Completed { sale_id: self.id.clone(), total: self.total }));
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), SaleError> {
        if self.status == SaleStatus::Cancelled { return Err(SaleError::AlreadyCancelled); }
        self.status = SaleStatus::Cancelled;
        self.touch();
        self.raise_event(DomainEvent::Sale(SaleEvent::Cancelled { sale_id: self.id.clone() }));
        Ok(())
    }

    fn ensure_pending(&self) -> Result<(), SaleError> {
        if self.status != SaleStatus::Pending { return Err(SaleError::NotPending(self.status)); }
        Ok(())
    }

    fn recalculate(&mut self) {
        self.subtotal = self.items.iter().map(|i| i.total).sum::<Money>().round();
        self.discount = self.discount.min(self.subtotal);
        self.total = match &self.installment_quote {
            Some(quote) => quote.total,
            None => self.subtotal.saturating_sub(self.discount).round(),
        };
        self.touch();
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SaleError {
    #[error("No items")]
    NoItems,
    #[error("Quantity must be at least 1")]
    InvalidQuantity,
    #[error("Discount cannot be negative")]
    InvalidDiscount,
    #[error("Sale is {0:?}, expected pending")]
    NotPending(SaleStatus),
    #[error("Sale is already cancelled")]
    AlreadyCancelled,
    #[error("Payment method is not cash")]
    NotCash,
    #[error("Received {} is less than the total {}", .received.amount(), .total.amount())]
    InsufficientPayment { total: Money, received: Money },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(qty: u32, cents: i64) -> SaleItem {
        SaleItem::new("P1", "Camiseta", Some("CAM-001".into()), None, qty, Money::from_cents(cents))
    }

    #[test]
    fn test_sale_workflow() {
        let mut sale = Sale::create(SaleChannel::Pdv, PaymentMethod::Cash { change_for: None });
        sale.add_item(item(2, 1000)).unwrap();
        sale.apply_discount(Money::from_cents(500), None).unwrap();
        assert_eq!(sale.total(), Money::from_cents(1500));
        assert_eq!(sale.receive_cash(Money::from_cents(1000)), Err(SaleError::InsufficientPayment { total: Money::from_cents(1500), received: Money::from_cents(1000) }));
        assert_eq!(sale.receive_cash(Money::from_cents(2000)).unwrap(), Money::from_cents(500));
        sale.complete().unwrap();
        assert_eq!(sale.status(), SaleStatus::Completed);
        assert_eq!(sale.add_item(item(1, 100)), Err(SaleError::NotPending(SaleStatus::Completed)));
        sale.cancel().unwrap();
        assert_eq!(sale.cancel(), Err(SaleError::AlreadyCancelled));
        assert_eq!(sale.take_events().len(), 3);
    }

    #[test]
    fn test_empty_sale_cannot_complete() {
        let mut sale = Sale::create(SaleChannel::Online, PaymentMethod::Pix);
        assert_eq!(sale.complete(), Err(SaleError::NoItems));
    }

    #[test]
    fn test_discount_capped() {
        let mut sale = Sale::create(SaleChannel::Pdv, PaymentMethod::Pix);
        sale.add_item(item(1, 1000)).unwrap();
        sale.apply_discount(Money::from_cents(5000), None).unwrap();
        assert_eq!(sale.total(), Money::ZERO);
    }

    #[test]
    fn test_number_is_date_prefixed() {
        let sale = Sale::create(SaleChannel::Pdv, PaymentMethod::Debit);
        let prefix: u64 = sale.created_at().format("%Y%m%d").to_string().parse().unwrap();
        assert_eq!(sale.number() / 10_000, prefix);
    }

    #[test]
    fn test_payment_labels() {
        assert_eq!(PaymentMethod::Credit { installments: 3 }.label(), "Cartão de crédito em 3x");
        assert_eq!(PaymentMethod::Credit { installments: 1 }.label(), "Cartão de crédito à vista");
    }
}
