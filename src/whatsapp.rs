//! Order messages sent to the store over WhatsApp.

use std::fmt::Write;

use crate::domain::aggregates::{Delivery, PaymentMethod, Sale};
use crate::domain::value_objects::WhatsAppNumber;
use crate::format::format_brl;
use crate::settings::SiteInfo;

/// Plain-text order summary in the store's order template.
pub fn order_message(info: &SiteInfo, sale: &Sale, customer_name: &str, customer_phone: &str) -> String {
    let mut msg = String::new();
    let _ = writeln!(msg, "{}", info.texts.order_greeting);
    let _ = writeln!(msg);
    let _ = writeln!(msg, "*Pedido #{}* - {}", sale.number(), info.store_name);
    let _ = writeln!(msg);

    for item in sale.items() {
        let option = item.option.as_deref().map(|o| format!(" ({o})")).unwrap_or_default();
        let _ = writeln!(msg, "{}x {}{} - {}", item.quantity, item.name, option, format_brl(item.total));
    }
    let _ = writeln!(msg);

    let _ = writeln!(msg, "Subtotal: {}", format_brl(sale.subtotal()));
    if !sale.discount().is_zero() {
        let coupon = sale.coupon_code().map(|c| format!(" (cupom {c})")).unwrap_or_default();
        let _ = writeln!(msg, "Desconto: -{}{}", format_brl(sale.discount()), coupon);
    }
    let _ = writeln!(msg, "*Total: {}*", format_brl(sale.total()));

    let _ = write!(msg, "Pagamento: {}", sale.payment().label());
    if let Some(quote) = sale.installment_quote().filter(|q| q.installments > 1) {
        let _ = write!(msg, " ({}x de {})", quote.installments, format_brl(quote.installment_value));
    }
    let _ = writeln!(msg);
    if let PaymentMethod::Cash { change_for: Some(amount) } = sale.payment() {
        let _ = writeln!(msg, "Troco para: {}", format_brl(*amount));
    }
    if let (PaymentMethod::Pix, Some(key)) = (sale.payment(), info.payment.pix_key.as_deref()) {
        let _ = writeln!(msg, "Chave Pix: {key}");
    }

    match sale.delivery() {
        Some(Delivery::Address { address }) => { let _ = writeln!(msg, "Entrega: {address}"); }
        Some(Delivery::Pickup) | None => { let _ = writeln!(msg, "Entrega: Retirada na loja"); }
    }
    if let Some(notes) = sale.notes() {
        let _ = writeln!(msg, "Observações: {notes}");
    }

    let _ = writeln!(msg);
    let _ = writeln!(msg, "Nome: {customer_name}");
    let _ = write!(msg, "Telefone: {customer_phone}");
    msg
}

/// `wa.me` link that opens a chat with `number` and `text` pre-filled.
pub fn wa_me_link(number: &WhatsAppNumber, text: &str) -> String {
    format!("https://wa.me/{}?text={}", number.as_str(), urlencoding::encode(text))
}
