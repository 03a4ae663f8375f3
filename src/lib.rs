//! Vitrine: multi-tenant storefront service.
//!
//! ## Features
//! - Product catalog, categories and per-store site settings
//! - Session carts, coupons and WhatsApp checkout
//! - PDV (counter) sales, sales history and seller commission
//! - Customers, employees and raffles
//! - AI sales assistant, product extraction and photo editing
//! - Media uploads and storefront analytics

pub mod ai;
pub mod analytics;
pub mod api;
pub mod chat;
pub mod config;
pub mod db;
pub mod domain;
pub mod format;
pub mod pricing;
pub mod realtime;
pub mod services;
pub mod settings;
pub mod storage;
pub mod whatsapp;
