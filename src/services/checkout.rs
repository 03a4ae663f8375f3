//! Storefront checkout.
//!
//! The order is placed as a pending online sale and handed to the store over
//! WhatsApp; payment is arranged in that conversation.

use serde::{Deserialize, Serialize};

use super::sales::{coupon_for, price_sale, sale_item};
use super::{cart, customers, ServiceError, ServiceResult};
use crate::db::Tenant;
use crate::domain::aggregates::{CartError, Coupon, Delivery, PaymentMethod, Product, Sale, SaleChannel};
use crate::domain::value_objects::{Money, WhatsAppNumber};
use crate::settings::SiteInfo;
use crate::whatsapp;

#[derive(Clone, Debug, Deserialize)]
pub struct CheckoutRequest {
    pub session_id: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub delivery: Delivery,
    pub payment: PaymentMethod,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct CheckoutResult {
    pub sale: Sale,
    pub message: String,
    pub whatsapp_url: String,
}

pub async fn checkout(tenant: &Tenant, info: &SiteInfo, request: CheckoutRequest) -> ServiceResult<CheckoutResult> {
    let store_number = info
        .whatsapp()
        .ok_or_else(|| ServiceError::Unavailable("this store has no WhatsApp number configured".into()))?;
    let customer_name = request.customer_name.trim();
    if customer_name.is_empty() {
        return Err(ServiceError::Validation("customer name is required".into()));
    }
    let customer_phone = WhatsAppNumber::new(&request.customer_phone).map_err(|e| ServiceError::Validation(e.to_string()))?;
    if let Delivery::Address { address } = &request.delivery {
        if address.trim().is_empty() {
            return Err(ServiceError::Validation("delivery address is required".into()));
        }
    }

    let cart = cart::load(tenant, &request.session_id).await?;
    if cart.is_empty() {
        return Err(CartError::Empty.into());
    }

    // Prices and stock are read again; the cart only holds snapshots.
    let mut sale = Sale::create(SaleChannel::Online, request.payment.clone());
    let products = tenant.repo::<Product>();
    for item in cart.items() {
        let product = products
            .get(&item.product_id)
            .await?
            .filter(Product::is_active)
            .ok_or_else(|| CartError::Unavailable(item.name.clone()))?;
        let available = product.stock().value();
        if cart.quantity_of(product.id()) > available {
            return Err(CartError::InsufficientStock { product: product.name().to_string(), available }.into());
        }
        sale.add_item(sale_item(&product, item.option.clone(), item.quantity)?)?;
    }

    let coupon = match cart.coupon_code() {
        Some(code) => Some(coupon_for(tenant, code, sale.subtotal()).await?),
        None => None,
    };
    let discount = coupon.as_ref().map_or(Money::ZERO, |(_, d)| *d);
    price_sale(&mut sale, info, discount, coupon.as_ref().map(|(c, _)| c.code.clone()))?;
    if let PaymentMethod::Cash { change_for: Some(amount) } = sale.payment() {
        if *amount < sale.total() {
            return Err(ServiceError::Validation("change must be for an amount of at least the total".into()));
        }
    }

    let customer = customers::upsert_by_phone(tenant, customer_name, customer_phone.as_str()).await?;
    sale.set_customer(Some(customer.id.clone()), Some(customer.name.clone()));
    sale.set_delivery(Some(request.delivery));
    sale.set_notes(request.notes);

    tenant.repo::<Sale>().save(&sale).await?;
    tenant.publish(sale.take_events()).await;
    if let Some((mut coupon, _)) = coupon {
        coupon.redeem();
        tenant.repo::<Coupon>().save(&coupon).await?;
    }
    cart::clear(tenant, &request.session_id).await?;

    let message = whatsapp::order_message(info, &sale, customer_name, customer_phone.as_str());
    let whatsapp_url = whatsapp::wa_me_link(&store_number, &message);
    tracing::info!(store = %tenant.id(), sale_id = %sale.id(), number = sale.number(), total = %sale.total().amount(), "order placed");
    Ok(CheckoutResult { sale, message, whatsapp_url })
}
