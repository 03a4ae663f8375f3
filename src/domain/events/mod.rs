//! Domain events raised by aggregates and fanned out by the event bus.
use crate::domain::value_objects::{Money, Sku};
use serde::Serialize;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "aggregate", rename_all = "snake_case")]
pub enum DomainEvent {
    Product(ProductEvent),
    Sale(SaleEvent),
    Raffle(RaffleEvent),
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProductEvent {
    Created { product_id: String, sku: Option<Sku> },
    Published { product_id: String },
    StockAdded { product_id: String, quantity: u32 },
    StockRemoved { product_id: String, quantity: u32 },
    OutOfStock { product_id: String },
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SaleEvent {
    Created { sale_id: String, number: u64 },
    Completed { sale_id: String, total: Money },
    Cancelled { sale_id: String },
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RaffleEvent {
    EntryAdded { raffle_id: String, entries: usize },
    Drawn { raffle_id: String, winner_entry_id: String },
}

impl DomainEvent {
    /// Short name used as the NATS subject suffix.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Product(ProductEvent::Created { .. }) => "product.created",
            Self::Product(ProductEvent::Published { .. }) => "product.published",
            Self::Product(ProductEvent::StockAdded { .. }) => "product.stock_added",
            Self::Product(ProductEvent::StockRemoved { .. }) => "product.stock_removed",
            Self::Product(ProductEvent::OutOfStock { .. }) => "product.out_of_stock",
            Self::Sale(SaleEvent::Created { .. }) => "sale.created",
            Self::Sale(SaleEvent::Completed { .. }) => "sale.completed",
            Self::Sale(SaleEvent::Cancelled { .. }) => "sale.cancelled",
            Self::Raffle(RaffleEvent::EntryAdded { .. }) => "raffle.entry_added",
            Self::Raffle(RaffleEvent::Drawn { .. }) => "raffle.drawn",
        }
    }
}
