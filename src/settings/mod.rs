//! Per-store site settings (`SiteInfo`).
//!
//! Stores persist only the fields they changed. Reads overlay that partial
//! document onto [`SiteInfo::default`] with [`deep_merge`], and the merged
//! result is cached per store for a short TTL.

pub mod merge;

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::db::{RepositoryError, Tenant};
use crate::domain::value_objects::{StoreId, WhatsAppNumber};
use crate::pricing::InstallmentPolicy;
use crate::realtime::ChangeKind;

pub use merge::deep_merge;

const COLLECTION: &str = "settings";
const DOCUMENT_ID: &str = "site_info";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteInfo {
    pub store_name: String,
    pub tagline: String,
    pub logo_url: Option<String>,
    pub whatsapp_number: Option<String>,
    pub instagram: Option<String>,
    pub address: Option<String>,
    pub currency: String,
    pub theme: Theme,
    pub texts: Texts,
    pub installments: InstallmentPolicy,
    pub payment: PaymentSettings,
    pub chatbot: ChatbotSettings,
    pub layout: Layout,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub primary_color: String,
    pub secondary_color: String,
    pub background_color: String,
    pub text_color: String,
    pub font_family: String,
    pub dark_mode: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Texts {
    pub hero_title: String,
    pub hero_subtitle: String,
    pub about: String,
    pub footer: String,
    /// First line of the WhatsApp order message.
    pub order_greeting: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentSettings {
    pub pix_key: Option<String>,
    /// Discount (percent) for Pix and cash payments.
    pub cash_discount_percent: Decimal,
    pub accepts_card: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatbotSettings {
    pub enabled: bool,
    pub assistant_name: String,
    pub greeting: String,
    pub persona: String,
    /// Character budget of one chat bubble.
    pub max_bubble_chars: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    pub products_per_row: u8,
    pub show_out_of_stock: bool,
    pub show_prices: bool,
    pub banner_urls: Vec<String>,
}

impl Default for SiteInfo {
    fn default() -> Self {
        Self {
            store_name: "Minha Loja".to_string(),
            tagline: "Os melhores produtos para você".to_string(),
            logo_url: None,
            whatsapp_number: None,
            instagram: None,
            address: None,
            currency: "BRL".to_string(),
            theme: Theme::default(),
            texts: Texts::default(),
            installments: InstallmentPolicy::default(),
            payment: PaymentSettings::default(),
            chatbot: ChatbotSettings::default(),
            layout: Layout::default(),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_color: "#111827".to_string(),
            secondary_color: "#f59e0b".to_string(),
            background_color: "#ffffff".to_string(),
            text_color: "#1f2937".to_string(),
            font_family: "Inter, sans-serif".to_string(),
            dark_mode: false,
        }
    }
}

impl Default for Texts {
    fn default() -> Self {
        Self {
            hero_title: "Bem-vindo!".to_string(),
            hero_subtitle: "Confira nossas novidades".to_string(),
            about: String::new(),
            footer: "Todos os direitos reservados.".to_string(),
            order_greeting: "Olá! Gostaria de fazer o seguinte pedido:".to_string(),
        }
    }
}

impl Default for PaymentSettings {
    fn default() -> Self {
        Self { pix_key: None, cash_discount_percent: Decimal::ZERO, accepts_card: true }
    }
}

impl Default for ChatbotSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            assistant_name: "Assistente".to_string(),
            greeting: "Olá! 👋 Posso ajudar você a encontrar o produto ideal?".to_string(),
            persona: "Você é um vendedor simpático e objetivo.".to_string(),
            max_bubble_chars: 160,
        }
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self { products_per_row: 2, show_out_of_stock: true, show_prices: true, banner_urls: vec![] }
    }
}

impl SiteInfo {
    /// The store's WhatsApp number, if configured and valid.
    pub fn whatsapp(&self) -> Option<WhatsAppNumber> {
        self.whatsapp_number.as_deref().and_then(|n| WhatsAppNumber::new(n).ok())
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.store_name.trim().is_empty() {
            return Err(SettingsError::Invalid("store_name is required".into()));
        }
        if let Some(number) = self.whatsapp_number.as_deref().filter(|n| !n.is_empty()) {
            WhatsAppNumber::new(number).map_err(|e| SettingsError::Invalid(format!("whatsapp_number: {e}")))?;
        }
        if self.chatbot.max_bubble_chars < 20 {
            return Err(SettingsError::Invalid("chatbot.max_bubble_chars must be at least 20".into()));
        }
        if self.payment.cash_discount_percent < Decimal::ZERO || self.payment.cash_discount_percent >= Decimal::ONE_HUNDRED {
            return Err(SettingsError::Invalid("payment.cash_discount_percent must be in [0, 100)".into()));
        }
        if self.installments.rates.values().any(|r| *r < Decimal::ZERO) {
            return Err(SettingsError::Invalid("installment rates cannot be negative".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid settings: {0}")]
    Invalid(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Reads and writes `SiteInfo` with a per-store cache.
#[derive(Clone)]
pub struct SettingsService {
    cache: Cache<StoreId, Arc<SiteInfo>>,
}

impl SettingsService {
    pub fn new(ttl: Duration) -> Self {
        Self { cache: Cache::builder().max_capacity(10_000).time_to_live(ttl).build() }
    }

    /// Merged settings for the tenant.
    pub async fn get(&self, tenant: &Tenant) -> Result<Arc<SiteInfo>, SettingsError> {
        if let Some(cached) = self.cache.get(tenant.id()).await {
            return Ok(cached);
        }
        let stored = tenant.docs().get(tenant.id(), COLLECTION, DOCUMENT_ID).await?;
        let info = Arc::new(Self::merged(stored.unwrap_or(JsonValue::Null))?);
        self.cache.insert(tenant.id().clone(), info.clone()).await;
        Ok(info)
    }

    /// Merges `patch` into the stored partial document and returns the new settings.
    pub async fn update(&self, tenant: &Tenant, patch: JsonValue) -> Result<Arc<SiteInfo>, SettingsError> {
        if !patch.is_object() {
            return Err(SettingsError::Invalid("settings patch must be a JSON object".into()));
        }
        let mut stored = tenant
            .docs()
            .get(tenant.id(), COLLECTION, DOCUMENT_ID)
            .await?
            .unwrap_or_else(|| JsonValue::Object(Default::default()));
        deep_merge(&mut stored, patch);

        let info = Self::merged(stored.clone())?;
        info.validate()?;

        let kind = tenant.docs().put(tenant.id(), COLLECTION, DOCUMENT_ID, &stored).await?;
        tenant.bus().change(tenant.id(), COLLECTION, DOCUMENT_ID, kind).await;
        let info = Arc::new(info);
        self.cache.insert(tenant.id().clone(), info.clone()).await;
        tracing::info!(store = %tenant.id(), "site settings updated");
        Ok(info)
    }

    /// Drops the stored overrides, returning the store to defaults.
    pub async fn reset(&self, tenant: &Tenant) -> Result<(), SettingsError> {
        if tenant.docs().delete(tenant.id(), COLLECTION, DOCUMENT_ID).await? {
            tenant.bus().change(tenant.id(), COLLECTION, DOCUMENT_ID, ChangeKind::Deleted).await;
        }
        self.cache.invalidate(tenant.id()).await;
        Ok(())
    }

    fn merged(stored: JsonValue) -> Result<SiteInfo, SettingsError> {
        let mut base = serde_json::to_value(SiteInfo::default()).map_err(RepositoryError::from)?;
        deep_merge(&mut base, stored);
        serde_json::from_value(base).map_err(|e| SettingsError::Invalid(e.to_string()))
    }
}
