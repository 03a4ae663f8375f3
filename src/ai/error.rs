//! Error types for the generative AI client.

use thiserror::Error;

/// Errors that can occur when calling the generative AI API.
#[derive(Debug, Error)]
pub enum AiError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with an error body.
    #[error("API error ({status}): {message}")]
    Api { status: String, message: String },

    #[error("rate limited, retry after {0} seconds")]
    RateLimited(u64),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Response (or the JSON the model wrote) could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// The model returned no usable content, e.g. because it was blocked.
    #[error("empty response: {0}")]
    EmptyResponse(String),

    /// The request had nothing for the model to work with.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("AI features are not configured")]
    NotConfigured,
}

/// Error body returned by the API.
#[derive(Debug, serde::Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, serde::Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub code: u16,
    pub message: String,
    #[serde(default)]
    pub status: String,
}
