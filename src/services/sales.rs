//! PDV sales, order confirmation and sales history.
//!
//! Stock moves when a sale is completed: PDV sales complete on the spot,
//! online orders when the store confirms them. Cancelling a sale that took
//! stock puts it back.

use std::collections::{BTreeMap, HashMap};

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{customers, not_found, ServiceError, ServiceResult};
use crate::db::Tenant;
use crate::domain::aggregates::coupon::normalize_code;
use crate::domain::aggregates::{
    Coupon, CouponError, Customer, Employee, PaymentMethod, Product, ProductError, Sale, SaleChannel, SaleError, SaleItem, SaleStatus,
};
use crate::domain::value_objects::Money;
use crate::settings::SiteInfo;

#[derive(Clone, Debug, Deserialize)]
pub struct SaleLine {
    pub product_id: String,
    #[serde(default)]
    pub option: Option<String>,
    pub quantity: u32,
}

/// Counter sale as rung up in the PDV screen.
#[derive(Clone, Debug, Deserialize)]
pub struct PdvSaleRequest {
    pub items: Vec<SaleLine>,
    pub payment: PaymentMethod,
    /// Manual discount granted by the seller.
    #[serde(default)]
    pub discount: Option<Money>,
    #[serde(default)]
    pub coupon_code: Option<String>,
    /// Cash handed over; defaults to the exact total.
    #[serde(default)]
    pub cash_received: Option<Money>,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub seller_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Snapshot of a product line at the current price.
pub(crate) fn sale_item(product: &Product, option: Option<String>, quantity: u32) -> Result<SaleItem, ServiceError> {
    if !product.is_active() {
        return Err(ServiceError::Validation(format!("{} is not available", product.name())));
    }
    let sizes = product.sizes();
    match option.as_deref() {
        None if !sizes.is_empty() => {
            return Err(ServiceError::Validation(format!("select a size/option for {}", product.name())));
        }
        Some(o) if !sizes.iter().any(|s| s == o) => {
            return Err(ServiceError::Validation(format!("unknown option {o} for {}", product.name())));
        }
        _ => {}
    }
    Ok(SaleItem::new(
        product.id(),
        product.name(),
        product.sku().map(ToString::to_string),
        option,
        quantity,
        product.effective_price(),
    ))
}

/// Loads a coupon and checks it against `subtotal`.
pub(crate) async fn coupon_for(tenant: &Tenant, code: &str, subtotal: Money) -> ServiceResult<(Coupon, Money)> {
    let code = normalize_code(code);
    let coupon = tenant.repo::<Coupon>().get(&code).await?.ok_or(CouponError::NotFound)?;
    let discount = coupon.discount_for(subtotal, Utc::now())?;
    Ok((coupon, discount))
}

/// Applies discounts and the card quote to a sale whose items are set.
///
/// The cash discount (Pix or cash) is taken on what remains after the manual
/// and coupon discounts. Card payments get an installment quote on the
/// discounted amount.
pub(crate) fn price_sale(sale: &mut Sale, info: &SiteInfo, discount: Money, coupon_code: Option<String>) -> ServiceResult<()> {
    let base = sale.subtotal().saturating_sub(discount);
    let cash_rate = info.payment.cash_discount_percent / Decimal::ONE_HUNDRED;
    let cash_discount = match sale.payment() {
        PaymentMethod::Pix | PaymentMethod::Cash { .. } if cash_rate > Decimal::ZERO => base.scale(cash_rate).round(),
        _ => Money::ZERO,
    };
    sale.apply_discount((discount + cash_discount).round(), coupon_code)?;

    if let PaymentMethod::Credit { installments } = *sale.payment() {
        if !info.payment.accepts_card {
            return Err(ServiceError::Validation("this store does not accept card payments".into()));
        }
        if !sale.total().is_zero() {
            let quote = info.installments.simulate(sale.total(), Money::ZERO, installments)?;
            sale.set_installment_quote(quote);
        }
    }
    Ok(())
}

/// Takes the sale's items out of stock. All lines are checked before any product is written.
async fn take_stock(tenant: &Tenant, sale: &Sale) -> ServiceResult<()> {
    // Summed in u64 so repeated lines of one product cannot overflow.
    let mut wanted: BTreeMap<&str, u64> = BTreeMap::new();
    for item in sale.items() {
        *wanted.entry(item.product_id.as_str()).or_default() += u64::from(item.quantity);
    }

    let repo = tenant.repo::<Product>();
    let mut products = Vec::with_capacity(wanted.len());
    for (&id, &quantity) in &wanted {
        let product = repo.get(id).await?.ok_or_else(|| not_found("product", id))?;
        let available = product.stock().value();
        let requested = u32::try_from(quantity).unwrap_or(u32::MAX);
        if u64::from(available) < quantity {
            return Err(ProductError::InsufficientStock { product: product.name().to_string(), available, requested }.into());
        }
        products.push((product, requested));
    }

    for (mut product, quantity) in products {
        product.remove_stock(quantity)?;
        repo.save(&product).await?;
        tenant.publish(product.take_events()).await;
    }
    Ok(())
}

/// Returns the items of a cancelled sale to stock. Deleted products are skipped.
async fn restock(tenant: &Tenant, sale: &Sale) -> ServiceResult<()> {
    let repo = tenant.repo::<Product>();
    for item in sale.items() {
        match repo.get(&item.product_id).await? {
            Some(mut product) => {
                product.add_stock(item.quantity);
                repo.save(&product).await?;
                tenant.publish(product.take_events()).await;
            }
            None => tracing::warn!(store = %tenant.id(), product_id = %item.product_id, "cannot restock deleted product"),
        }
    }
    Ok(())
}

async fn record_purchase(tenant: &Tenant, sale: &Sale) -> ServiceResult<()> {
    let Some(id) = sale.customer_id() else { return Ok(()) };
    let repo = tenant.repo::<Customer>();
    if let Some(mut customer) = repo.get(id).await? {
        customer.record_purchase(sale.total(), sale.completed_at().unwrap_or_else(Utc::now));
        repo.save(&customer).await?;
    }
    Ok(())
}

async fn release_coupon(tenant: &Tenant, sale: &Sale) -> ServiceResult<()> {
    let Some(code) = sale.coupon_code() else { return Ok(()) };
    let repo = tenant.repo::<Coupon>();
    if let Some(mut coupon) = repo.get(code).await? {
        coupon.release();
        repo.save(&coupon).await?;
    }
    Ok(())
}

async fn revert_purchase(tenant: &Tenant, sale: &Sale) -> ServiceResult<()> {
    let Some(id) = sale.customer_id() else { return Ok(()) };
    let repo = tenant.repo::<Customer>();
    if let Some(mut customer) = repo.get(id).await? {
        customer.revert_purchase(sale.total());
        repo.save(&customer).await?;
    }
    Ok(())
}

/// Rings up a counter sale: validates, takes stock and completes it.
pub async fn create_pdv_sale(tenant: &Tenant, info: &SiteInfo, request: PdvSaleRequest) -> ServiceResult<Sale> {
    if request.items.is_empty() {
        return Err(SaleError::NoItems.into());
    }
    let mut sale = Sale::create(SaleChannel::Pdv, request.payment.clone());
    for line in &request.items {
        let product = tenant.repo::<Product>().get(&line.product_id).await?.ok_or_else(|| not_found("product", &line.product_id))?;
        sale.add_item(sale_item(&product, line.option.clone(), line.quantity)?)?;
    }

    let manual = request.discount.unwrap_or(Money::ZERO);
    if manual.is_negative() {
        return Err(SaleError::InvalidDiscount.into());
    }
    let coupon = match request.coupon_code.as_deref().filter(|c| !c.trim().is_empty()) {
        Some(code) => Some(coupon_for(tenant, code, sale.subtotal()).await?),
        None => None,
    };
    let coupon_discount = coupon.as_ref().map_or(Money::ZERO, |(_, d)| *d);
    price_sale(&mut sale, info, manual + coupon_discount, coupon.as_ref().map(|(c, _)| c.code.clone()))?;

    match request.customer_id {
        Some(id) => {
            let customer = customers::get(tenant, &id).await?;
            sale.set_customer(Some(customer.id), Some(customer.name));
        }
        None => sale.set_customer(None, request.customer_name.filter(|n| !n.trim().is_empty())),
    }
    if let Some(seller_id) = &request.seller_id {
        if tenant.repo::<Employee>().get(seller_id).await?.is_none() {
            return Err(not_found("employee", seller_id));
        }
    }
    sale.set_seller(request.seller_id);
    sale.set_notes(request.notes);
    if matches!(sale.payment(), PaymentMethod::Cash { .. }) {
        sale.receive_cash(request.cash_received.unwrap_or(sale.total()))?;
    }

    take_stock(tenant, &sale).await?;
    sale.mark_stock_applied(true);
    sale.complete()?;
    tenant.repo::<Sale>().save(&sale).await?;
    tenant.publish(sale.take_events()).await;

    if let Some((mut coupon, _)) = coupon {
        coupon.redeem();
        tenant.repo::<Coupon>().save(&coupon).await?;
    }
    record_purchase(tenant, &sale).await?;
    tracing::info!(store = %tenant.id(), sale_id = %sale.id(), number = sale.number(), total = %sale.total().amount(), "pdv sale completed");
    Ok(sale)
}

pub async fn get(tenant: &Tenant, id: &str) -> ServiceResult<Sale> {
    tenant.repo::<Sale>().get(id).await?.ok_or_else(|| not_found("sale", id))
}

/// Confirms a pending (online) sale, taking its items out of stock.
pub async fn complete(tenant: &Tenant, id: &str) -> ServiceResult<Sale> {
    let mut sale = get(tenant, id).await?;
    if sale.status() != SaleStatus::Pending {
        return Err(SaleError::NotPending(sale.status()).into());
    }
    if !sale.stock_applied() {
        take_stock(tenant, &sale).await?;
        sale.mark_stock_applied(true);
    }
    sale.complete()?;
    tenant.repo::<Sale>().save(&sale).await?;
    tenant.publish(sale.take_events()).await;
    record_purchase(tenant, &sale).await?;
    tracing::info!(store = %tenant.id(), sale_id = %id, "sale completed");
    Ok(sale)
}

/// Cancels a sale; stock taken for it is returned, customer stats and the
/// coupon redemption are reverted.
pub async fn cancel(tenant: &Tenant, id: &str) -> ServiceResult<Sale> {
    let mut sale = get(tenant, id).await?;
    let was_completed = sale.status() == SaleStatus::Completed;
    sale.cancel()?;
    if sale.stock_applied() {
        restock(tenant, &sale).await?;
        sale.mark_stock_applied(false);
    }
    tenant.repo::<Sale>().save(&sale).await?;
    tenant.publish(sale.take_events()).await;
    if was_completed {
        revert_purchase(tenant, &sale).await?;
    }
    release_coupon(tenant, &sale).await?;
    tracing::info!(store = %tenant.id(), sale_id = %id, "sale cancelled");
    Ok(sale)
}

/// History filters; dates are inclusive and compared in UTC.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub channel: Option<SaleChannel>,
    pub status: Option<SaleStatus>,
    pub seller_id: Option<String>,
}

impl HistoryQuery {
    fn accepts(&self, sale: &Sale) -> bool {
        let day = sale.created_at().date_naive();
        self.from.map_or(true, |from| day >= from)
            && self.to.map_or(true, |to| day <= to)
            && self.channel.map_or(true, |c| sale.channel() == c)
            && self.status.map_or(true, |s| sale.status() == s)
            && self.seller_id.as_deref().map_or(true, |s| sale.seller_id() == Some(s))
    }
}

/// Matching sales, newest first.
pub async fn history(tenant: &Tenant, query: &HistoryQuery) -> ServiceResult<Vec<Sale>> {
    let mut sales: Vec<Sale> = tenant.repo::<Sale>().list().await?.into_iter().filter(|s| query.accepts(s)).collect();
    sales.sort_by_key(|s| std::cmp::Reverse(s.created_at()));
    Ok(sales)
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SellerTotals {
    pub seller_id: String,
    pub name: Option<String>,
    pub sales: u32,
    pub total: Money,
    pub commission: Money,
}

/// Totals over completed sales; pending and cancelled ones are only counted.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SalesSummary {
    pub count: u32,
    pub gross_total: Money,
    pub discount_total: Money,
    pub average_ticket: Money,
    pub by_payment: BTreeMap<String, Money>,
    pub by_seller: Vec<SellerTotals>,
    pub pending: u32,
    pub cancelled: u32,
}

pub fn summarize(sales: &[Sale], employees: &[Employee]) -> SalesSummary {
    let mut summary = SalesSummary::default();
    let mut sellers: BTreeMap<String, SellerTotals> = BTreeMap::new();
    for sale in sales {
        match sale.status() {
            SaleStatus::Pending => summary.pending += 1,
            SaleStatus::Cancelled => summary.cancelled += 1,
            SaleStatus::Completed => {
                summary.count += 1;
                summary.gross_total = summary.gross_total + sale.total();
                summary.discount_total = summary.discount_total + sale.discount();
                let by_payment = summary.by_payment.entry(sale.payment().kind().to_string()).or_default();
                *by_payment = *by_payment + sale.total();
                if let Some(seller_id) = sale.seller_id() {
                    let totals = sellers.entry(seller_id.to_string()).or_insert_with(|| SellerTotals {
                        seller_id: seller_id.to_string(),
                        ..Default::default()
                    });
                    totals.sales += 1;
                    totals.total = totals.total + sale.total();
                }
            }
        }
    }

    let by_id: HashMap<&str, &Employee> = employees.iter().map(|e| (e.id.as_str(), e)).collect();
    summary.by_seller = sellers
        .into_values()
        .map(|mut totals| {
            if let Some(employee) = by_id.get(totals.seller_id.as_str()) {
                totals.name = Some(employee.name.clone());
                totals.commission = employee.commission_on(totals.total);
            }
            totals
        })
        .collect();
    if summary.count > 0 {
        summary.average_ticket = Money::new(summary.gross_total.amount() / Decimal::from(summary.count)).round();
    }
    summary
}

pub async fn summary(tenant: &Tenant, query: &HistoryQuery) -> ServiceResult<SalesSummary> {
    let sales = history(tenant, query).await?;
    let employees = tenant.repo::<Employee>().list().await?;
    Ok(summarize(&sales, &employees))
}
