//! Aggregates module
pub mod product;
pub mod category;
pub mod cart;
pub mod coupon;
pub mod sale;
pub mod customer;
pub mod employee;
pub mod raffle;
pub mod chat;

pub use product::{Product, ProductError, ProductInput, ProductStatus};
pub use category::{Category, CategoryError, CategoryInput};
pub use cart::{Cart, CartError, CartItem};
pub use coupon::{Coupon, CouponError, CouponInput, Discount};
pub use sale::{Delivery, PaymentMethod, Sale, SaleChannel, SaleError, SaleItem, SaleStatus};
pub use customer::{Customer, CustomerError, CustomerInput};
pub use employee::{Employee, EmployeeError, EmployeeInput, EmployeeRole};
pub use raffle::{Raffle, RaffleEntry, RaffleError, RaffleInput, RaffleStatus, RaffleSummary};
pub use chat::{ChatMessage, ChatRole, ChatThread};
