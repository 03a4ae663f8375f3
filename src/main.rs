//! Vitrine - multi-tenant storefront, PDV and sales-assistant service

use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vitrine::ai::{GeminiClient, GenerativeModel};
use vitrine::api::{self, AppState};
use vitrine::config::AppConfig;
use vitrine::db::{DocumentStore, MemoryDocumentStore, PgDocumentStore};
use vitrine::realtime::EventBus;
use vitrine::settings::SettingsService;
use vitrine::storage::LocalObjectStore;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let config = AppConfig::from_env()?;

    let docs: Arc<dyn DocumentStore> = match &config.database_url {
        Some(url) => Arc::new(PgDocumentStore::connect(url).await?),
        None => {
            tracing::warn!("DATABASE_URL not set, documents are kept in memory");
            Arc::new(MemoryDocumentStore::default())
        }
    };

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable, events stay in-process");
                None
            }
        },
        None => None,
    };

    let ai: Option<Arc<dyn GenerativeModel>> = match &config.ai {
        Some(ai) => Some(Arc::new(GeminiClient::new(ai)?)),
        None => {
            tracing::info!("AI_API_KEY not set, AI features disabled");
            None
        }
    };
    if config.admin_token.is_none() {
        tracing::warn!("ADMIN_API_TOKEN not set, admin API disabled");
    }

    tokio::fs::create_dir_all(&config.media.root).await?;
    let objects = Arc::new(LocalObjectStore::new(config.media.root.clone(), config.media.public_url.clone()));

    let addr = config.socket_addr();
    let state = AppState {
        settings: SettingsService::new(config.settings_cache_ttl),
        config: Arc::new(config),
        docs,
        bus: EventBus::new(nats),
        ai,
        objects,
    };
    let app = api::router(state);

    tracing::info!("🚀 Vitrine listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}
