//! Product Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;
use crate::domain::value_objects::{Sku, Money, Quantity};
use crate::domain::events::{DomainEvent, ProductEvent};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Product {
    id: String,
    sku: Option<Sku>,
    name: String,
    description: String,
    price: Money,
    promotional_price: Option<Money>,
    cost: Option<Money>,
    stock: Quantity,
    status: ProductStatus,
    category_id: Option<String>,
    tags: Vec<String>,
    sizes: Vec<String>,
    images: Vec<String>,
    featured: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus { #[default] Draft, Active, Archived }

/// Admin form payload used for both create and update.
#[derive(Clone, Debug, Default, Deserialize, Validate)]
pub struct ProductInput {
    #[validate(length(min = 1, max = 200, message = "name is required"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub description: String,
    #[serde(default)]
    pub sku: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub promotional_price: Option<Decimal>,
    #[serde(default)]
    pub cost: Option<Decimal>,
    #[serde(default)]
    #[validate(range(min = 0, message = "stock cannot be negative"))]
    pub stock: i64,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    #[validate(length(max = 12))]
    pub images: Vec<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub status: Option<ProductStatus>,
}

impl ProductInput {
    fn checked(&self) -> Result<Checked, ProductError> {
        self.validate().map_err(|e| ProductError::Invalid(e.to_string()))?;
        if self.name.trim().is_empty() { return Err(ProductError::MissingName); }
        let price = Money::new(self.price);
        if price.is_negative() { return Err(ProductError::NegativePrice); }
        let promotional_price = self.promotional_price.map(Money::new);
        if let Some(promo) = promotional_price {
            if promo.is_negative() || promo >= price { return Err(ProductError::InvalidPromotion); }
        }
        let cost = self.cost.map(Money::new);
        if cost.is_some_and(|c| c.is_negative()) { return Err(ProductError::NegativePrice); }
        let stock = u32::try_from(self.stock).map_err(|_| ProductError::NegativeStock)?;
        let sku = match self.sku.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => Some(Sku::new(s).map_err(|e| ProductError::Invalid(e.to_string()))?),
            _ => None,
        };
        Ok(Checked { sku, price, promotional_price, cost, stock: Quantity::new(stock) })
    }
}

struct Checked { sku: Option<Sku>, price: Money, promotional_price: Option<Money>, cost: Option<Money>, stock: Quantity }

impl Product {
    pub fn create(input: &ProductInput) -> Result<Self, ProductError> {
        let checked = input.checked()?;
        let id = Uuid::now_v7().to_string();
        let now = Utc::now();
        let mut product = Self {
            id: id.clone(), sku: checked.sku.clone(), name: input.name.trim().to_string(),
            description: input.description.clone(), price: checked.price,
            promotional_price: checked.promotional_price, cost: checked.cost, stock: checked.stock,
            status: input.status.clone().unwrap_or_default(),
            category_id: input.category_id.clone(), tags: input.tags.clone(), sizes: input.sizes.clone(),
            images: input.images.clone(), featured: input.featured,
            created_at: now, updated_at: now, events: vec![],
        };
        product.raise_event(DomainEvent::Product(ProductEvent::Created { product_id: id, sku: checked.sku }));
        Ok(product)
    }

    /// Replaces the editable fields, keeping id, creation time and status unless given.
    pub fn update(&mut self, input: &ProductInput) -> Result<(), ProductError> {
        let checked = input.checked()?;
        self.sku = checked.sku;
        self.name = input.name.trim().to_string();
        self.description = input.description.clone();
        self.price = checked.price;
        self.promotional_price = checked.promotional_price;
        self.cost = checked.cost;
        self.stock = checked.stock;
        self.category_id = input.category_id.clone();
        self.tags = input.tags.clone();
        self.sizes = input.sizes.clone();
        self.images = input.images.clone();
        self.featured = input.featured;
        if let Some(status) = &input.status { self.status = status.clone(); }
        self.touch();
        Ok(())
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn sku(&self) -> Option<&Sku> { self.sku.as_ref() }
    pub fn name(&self) -> &str { &self.name }
    pub fn description(&self) -> &str { &self.description }
    pub fn price(&self) -> Money { self.price }
    pub fn promotional_price(&self) -> Option<Money> { self.promotional_price }
    pub fn cost(&self) -> Option<Money> { self.cost }
    pub fn stock(&self) -> Quantity { self.stock }
    pub fn status(&self) -> &ProductStatus { &self.status }
    pub fn category_id(&self) -> Option<&str> { self.category_id.as_deref() }
    pub fn tags(&self) -> &[String] { &self.tags }
    pub fn sizes(&self) -> &[String] { &self.sizes }
    pub fn images(&self) -> &[String] { &self.images }
    pub fn is_featured(&self) -> bool { self.featured }
    pub fn is_active(&self) -> bool { self.status == ProductStatus::Active }
    pub fn is_in_stock(&self) -> bool { !self.stock.is_zero() }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }

    /// Price charged at checkout: the promotional price when one is set.
    pub fn effective_price(&self) -> Money { self.promotional_price.unwrap_or(self.price) }

    /// Case-insensitive match on name, description, SKU and tags.
    pub fn matches(&self, query: &str) -> bool {
        let q = query.trim().to_lowercase();
        if q.is_empty() { return true; }
        self.name.to_lowercase().contains(&q)
            || self.description.to_lowercase().contains(&q)
            || self.sku.as_ref().is_some_and(|s| s.as_str().to_lowercase().contains(&q))
            || self.tags.iter().any(|t| t.to_lowercase().contains(&q))
    }

    pub fn publish(&mut self) -> Result<(), ProductError> {
        if self.name.is_empty() { return Err(ProductError::MissingName); }
        self.status = ProductStatus::Active;
        self.touch();
        self.raise_event(DomainEvent::Product(ProductEvent::Published { product_id: self.id.clone() }));
        Ok(())
    }

    pub fn archive(&mut self) { self.status = ProductStatus::Archived; self.touch(); }

    pub fn add_stock(&mut self, qty: u32) {
        self.stock = self.stock.add(qty);
        self.touch();
        self.raise_event(DomainEvent::Product(ProductEvent::StockAdded { product_id: self.id.clone(), quantity: qty }));
    }

    pub fn remove_stock(&mut self, qty: u32) -> Result<(), ProductError> {
        self.stock = self.stock.subtract(qty).ok_or(ProductError::InsufficientStock {
            product: self.name.clone(), available: self.stock.value(), requested: qty,
        })?;
        self.touch();
        self.raise_event(DomainEvent::Product(ProductEvent::StockRemoved { product_id: self.id.clone(), quantity: qty }));
        if self.stock.is_zero() {
            self.raise_event(DomainEvent::Product(ProductEvent::OutOfStock { product_id: self.id.clone() }));
        }
        Ok(())
    }

    /// Signed stock adjustment from the admin panel.
    pub fn adjust_stock(&mut self, delta: i64) -> Result<(), ProductError> {
        match u32::try_from(delta.unsigned_abs()) {
            Ok(qty) if delta >= 0 => { self.add_stock(qty); Ok(()) }
            Ok(qty) => self.remove_stock(qty),
            Err(_) => Err(ProductError::Invalid("stock adjustment out of range".into())),
        }
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProductError {
    #[error("Missing name")]
    MissingName,
    #[error("Price cannot be negative")]
    NegativePrice,
    #[error("Stock cannot be negative")]
    NegativeStock,
    #[error("Promotional price must be lower than the regular price")]
    InvalidPromotion,
    #[error("Insufficient stock for {product}: {available} available, {requested} requested")]
    InsufficientStock { product: String, available: u32, requested: u32 },
    #[error("Invalid product: {0}")]
    Invalid(String),
}
