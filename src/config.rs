//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `VITRINE_HOST` - Bind address (default: 0.0.0.0)
//! - `VITRINE_PORT` - Listen port (default: 8083)
//! - `DATABASE_URL` - `PostgreSQL` connection string; documents are kept in memory when unset
//! - `NATS_URL` - NATS server for change events
//! - `ADMIN_API_TOKEN` - Bearer token for the admin API; admin routes are disabled when unset
//! - `AI_API_KEY` - Generative AI key; AI features are disabled when unset
//! - `AI_BASE_URL` - Generative AI endpoint (default: Gemini v1beta)
//! - `AI_MODEL` - Text and vision model
//! - `AI_IMAGE_MODEL` - Image editing model
//! - `MEDIA_ROOT` - Directory for uploaded media (default: ./media)
//! - `MEDIA_PUBLIC_URL` - URL prefix for uploaded media (default: /media)
//! - `SETTINGS_CACHE_TTL_SECS` - Site settings cache TTL (default: 60)
//! - `CHAT_HISTORY_LIMIT` - Chat messages sent to the model per reply (default: 20)

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_AI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_AI_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_AI_IMAGE_MODEL: &str = "gemini-2.0-flash-preview-image-generation";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: IpAddr,
    pub port: u16,
    /// `PostgreSQL` URL (contains password)
    pub database_url: Option<SecretString>,
    pub nats_url: Option<String>,
    pub admin_token: Option<SecretString>,
    pub ai: Option<AiConfig>,
    pub media: MediaConfig,
    pub settings_cache_ttl: Duration,
    pub chat_history_limit: usize,
}

/// Generative AI configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct AiConfig {
    pub api_key: SecretString,
    pub base_url: String,
    pub model: String,
    pub image_model: String,
}

impl std::fmt::Debug for AiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("image_model", &self.image_model)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct MediaConfig {
    pub root: PathBuf,
    pub public_url: String,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an unparseable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars(&lookup);

        let host = vars.parse("VITRINE_HOST", "0.0.0.0")?;
        let port = vars.parse("VITRINE_PORT", "8083")?;
        let database_url = vars.optional("DATABASE_URL").map(SecretString::from);
        let nats_url = vars.optional("NATS_URL");
        let admin_token = vars.optional("ADMIN_API_TOKEN").map(SecretString::from);

        let ai = match vars.optional("AI_API_KEY") {
            Some(key) => {
                let base_url = vars.or_default("AI_BASE_URL", DEFAULT_AI_BASE_URL);
                url::Url::parse(&base_url).map_err(|e| ConfigError::InvalidEnvVar("AI_BASE_URL".into(), e.to_string()))?;
                Some(AiConfig {
                    api_key: SecretString::from(key),
                    base_url: base_url.trim_end_matches('/').to_string(),
                    model: vars.or_default("AI_MODEL", DEFAULT_AI_MODEL),
                    image_model: vars.or_default("AI_IMAGE_MODEL", DEFAULT_AI_IMAGE_MODEL),
                })
            }
            None => None,
        };

        let media = MediaConfig {
            root: PathBuf::from(vars.or_default("MEDIA_ROOT", "./media")),
            public_url: vars.or_default("MEDIA_PUBLIC_URL", "/media").trim_end_matches('/').to_string(),
        };

        let settings_cache_ttl = Duration::from_secs(vars.parse("SETTINGS_CACHE_TTL_SECS", "60")?);
        let chat_history_limit: usize = vars.parse("CHAT_HISTORY_LIMIT", "20")?;
        if chat_history_limit == 0 {
            return Err(ConfigError::InvalidEnvVar("CHAT_HISTORY_LIMIT".into(), "must be at least 1".into()));
        }

        Ok(Self {
            host,
            port,
            database_url,
            nats_url,
            admin_token,
            ai,
            media,
            settings_cache_ttl,
            chat_history_limit,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

struct Vars<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Vars<'_, F> {
    /// Empty values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parse<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.or_default(key, default)
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }
}
