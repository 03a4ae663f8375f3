//! HTTP client for the Gemini `generateContent` API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use secrecy::ExposeSecret;
use tracing::instrument;

use super::error::{AiError, ApiErrorResponse};
use super::types::{GenerateRequest, GenerateResponse};
use super::{GenerativeModel, ModelKind};
use crate::config::AiConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini API client.
#[derive(Clone)]
pub struct GeminiClient {
    inner: Arc<GeminiClientInner>,
}

struct GeminiClientInner {
    client: reqwest::Client,
    base_url: String,
    model: String,
    image_model: String,
}

impl GeminiClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is not a valid header value or the
    /// HTTP client cannot be built.
    pub fn new(config: &AiConfig) -> Result<Self, AiError> {
        let mut key = HeaderValue::from_str(config.api_key.expose_secret())
            .map_err(|_| AiError::Unauthorized("API key contains invalid characters".to_string()))?;
        key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(API_KEY_HEADER, key);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(GeminiClientInner {
                client,
                base_url: config.base_url.clone(),
                model: config.model.clone(),
                image_model: config.image_model.clone(),
            }),
        })
    }

    fn model_for(&self, kind: ModelKind) -> &str {
        match kind {
            ModelKind::Text => &self.inner.model,
            ModelKind::Image => &self.inner.image_model,
        }
    }

    async fn handle_response(&self, response: reqwest::Response) -> Result<GenerateResponse, AiError> {
        let status = response.status();
        if status.is_success() {
            let body = response.text().await?;
            serde_json::from_str(&body).map_err(|e| AiError::Parse(format!("Failed to parse response: {e}")))
        } else {
            Err(self.handle_error_status(status, response).await)
        }
    }

    async fn handle_error_status(&self, status: reqwest::StatusCode, response: reqwest::Response) -> AiError {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return AiError::RateLimited(retry_after);
        }

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return AiError::Unauthorized("API key rejected".to_string());
        }

        match response.text().await {
            Ok(body) => match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_error) => AiError::Api {
                    status: if api_error.error.status.is_empty() { status.to_string() } else { api_error.error.status },
                    message: api_error.error.message,
                },
                Err(_) => AiError::Api { status: status.to_string(), message: body },
            },
            Err(e) => AiError::Http(e),
        }
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    #[instrument(skip(self, request), fields(model = %self.model_for(kind)))]
    async fn generate(&self, kind: ModelKind, request: GenerateRequest) -> Result<GenerateResponse, AiError> {
        let url = format!("{}/models/{}:generateContent", self.inner.base_url, self.model_for(kind));
        let response = self.inner.client.post(url).json(&request).send().await?;
        let response = self.handle_response(response).await?;
        if let Some(usage) = response.usage_metadata {
            tracing::debug!(
                prompt_tokens = usage.prompt_token_count,
                output_tokens = usage.candidates_token_count,
                "generateContent finished"
            );
        }
        Ok(response)
    }
}
