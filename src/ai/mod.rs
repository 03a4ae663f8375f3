//! Generative AI integration.
//!
//! Product extraction, image editing, chat replies and margin commentary
//! all go through [`GenerativeModel`], implemented for the Gemini
//! `generateContent` API by [`GeminiClient`]. Tests substitute a scripted
//! model.

pub mod client;
pub mod error;
pub mod tasks;
pub mod types;

use async_trait::async_trait;

pub use client::GeminiClient;
pub use error::AiError;
pub use types::{Content, GenerateRequest, GenerateResponse, GenerationConfig, InlineData, Part};

/// Which configured model a request is meant for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelKind {
    /// Text and vision.
    Text,
    /// Image output.
    Image,
}

#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, kind: ModelKind, request: GenerateRequest) -> Result<GenerateResponse, AiError>;
}
