//! Cart Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::domain::aggregates::product::Product;
use crate::domain::value_objects::Money;

/// Shopping cart of one storefront session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cart {
    session_id: String,
    items: Vec<CartItem>,
    coupon_code: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: String,
    /// Selected size/option, if the product offers any.
    pub option: Option<String>,
    pub name: String,
    pub sku: Option<String>,
    pub image: Option<String>,
    pub quantity: u32,
    pub unit_price: Money,
}

impl CartItem {
    pub fn from_product(product: &Product, option: Option<String>, quantity: u32) -> Self {
        Self {
            product_id: product.id().to_string(), option, name: product.name().to_string(),
            sku: product.sku().map(|s| s.to_string()), image: product.images().first().cloned(),
            quantity, unit_price: product.effective_price(),
        }
    }
    pub fn line_total(&self) -> Money { self.unit_price.multiply(self.quantity) }
    fn is_same(&self, product_id: &str, option: Option<&str>) -> bool {
        self.product_id == product_id && self.option.as_deref() == option
    }
}

impl Cart {
    pub fn new(session_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self { session_id: session_id.into(), items: vec![], coupon_code: None, created_at: now, updated_at: now }
    }

    pub fn session_id(&self) -> &str { &self.session_id }
    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn coupon_code(&self) -> Option<&str> { self.coupon_code.as_deref() }
    pub fn item_count(&self) -> u32 { self.items.iter().fold(0, |n, i| n.saturating_add(i.quantity)) }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn subtotal(&self) -> Money { self.items.iter().map(CartItem::line_total).sum::<Money>().round() }

    /// Quantity of a product already in the cart, across all options.
    pub fn quantity_of(&self, product_id: &str) -> u32 {
        self.items.iter().filter(|i| i.product_id == product_id).fold(0, |n, i| n.saturating_add(i.quantity))
    }

    /// Adds `quantity` of the product, merging with an existing line of the same option.
    pub fn add_item(&mut self, product: &Product, option: Option<String>, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 { return Err(CartError::InvalidQuantity); }
        if !product.is_active() { return Err(CartError::Unavailable(product.name().to_string())); }
        Self::check_option(product, option.as_deref())?;
        Self::check_stock(product, self.quantity_of(product.id()).checked_add(quantity))?;
        if let Some(existing) = self.items.iter_mut().find(|i| i.is_same(product.id(), option.as_deref())) {
            existing.quantity = existing.quantity.saturating_add(quantity);
            existing.unit_price = product.effective_price();
        } else {
            self.items.push(CartItem::from_product(product, option, quantity));
        }
        self.touch();
        Ok(())
    }

    /// Sets the quantity of a line; zero removes it.
    pub fn update_quantity(&mut self, product: &Product, option: Option<&str>, quantity: u32) -> Result<(), CartError> {
        let idx = self.items.iter().position(|i| i.is_same(product.id(), option)).ok_or(CartError::ItemNotFound)?;
        if quantity == 0 {
            self.items.remove(idx);
        } else {
            let others = self.quantity_of(product.id()).saturating_sub(self.items[idx].quantity);
            Self::check_stock(product, others.checked_add(quantity))?;
            self.items[idx].quantity = quantity;
        }
        self.touch();
        Ok(())
    }

    pub fn remove_item(&mut self, product_id: &str, option: Option<&str>) -> Result<(), CartError> {
        let before = self.items.len();
        self.items.retain(|i| !i.is_same(product_id, option));
        if self.items.len() == before { return Err(CartError::ItemNotFound); }
        self.touch();
        Ok(())
    }

    pub fn set_coupon(&mut self, code: Option<String>) { self.coupon_code = code; self.touch(); }

    /// `wanted` is `None` when the requested total overflowed.
    fn check_stock(product: &Product, wanted: Option<u32>) -> Result<(), CartError> {
        let available = product.stock().value();
        match wanted {
            Some(wanted) if wanted <= available => Ok(()),
            _ => Err(CartError::InsufficientStock { product: product.name().to_string(), available }),
        }
    }

    fn check_option(product: &Product, option: Option<&str>) -> Result<(), CartError> {
        match option {
            None if !product.sizes().is_empty() => Err(CartError::OptionRequired),
            Some(o) if !product.sizes().iter().any(|s| s == o) => Err(CartError::UnknownOption(o.to_string())),
            _ => Ok(()),
        }
    }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CartError {
    #[error("Item not found")]
    ItemNotFound,
    #[error("Quantity must be at least 1")]
    InvalidQuantity,
    #[error("{0} is not available")]
    Unavailable(String),
    #[error("Select a size/option for this product")]
    OptionRequired,
    #[error("Unknown option: {0}")]
    UnknownOption(String),
    #[error("Only {available} of {product} in stock")]
    InsufficientStock { product: String, available: u32 },
    #[error("Cart is empty")]
    Empty,
}
