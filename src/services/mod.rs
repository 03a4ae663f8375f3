//! Store operations.
//!
//! Each function works on one tenant and returns [`ServiceError`], which the
//! HTTP layer maps onto status codes.

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod coupons;
pub mod customers;
pub mod employees;
pub mod raffles;
pub mod sales;

use thiserror::Error;

use crate::ai::AiError;
use crate::db::RepositoryError;
use crate::domain::aggregates::{
    CartError, CategoryError, CouponError, CustomerError, EmployeeError, ProductError, RaffleError, SaleError,
};
use crate::pricing::PricingError;
use crate::settings::SettingsError;
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("{0}")]
    Validation(String),

    /// A required store setting or integration is missing.
    #[error("{0}")]
    Unavailable(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Product(#[from] ProductError),
    #[error(transparent)]
    Category(#[from] CategoryError),
    #[error(transparent)]
    Cart(#[from] CartError),
    #[error(transparent)]
    Coupon(#[from] CouponError),
    #[error(transparent)]
    Sale(#[from] SaleError),
    #[error(transparent)]
    Customer(#[from] CustomerError),
    #[error(transparent)]
    Employee(#[from] EmployeeError),
    #[error(transparent)]
    Raffle(#[from] RaffleError),
    #[error(transparent)]
    Pricing(#[from] PricingError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Ai(#[from] AiError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

pub(crate) fn not_found(entity: &'static str, id: &str) -> ServiceError {
    ServiceError::NotFound { entity, id: id.to_string() }
}
