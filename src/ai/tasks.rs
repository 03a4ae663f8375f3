//! Prompt builders and response parsers for the AI-assisted admin tasks.

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{AiError, Content, GenerateRequest, GenerationConfig, GenerativeModel, ModelKind, Part};
use crate::format::format_brl;
use crate::pricing::MarginBreakdown;

const EXTRACT_PROMPT: &str = "Você cadastra produtos em uma loja online brasileira. \
Extraia os dados do produto a partir do texto e/ou da foto e responda somente com JSON no formato \
{\"name\": string, \"description\": string, \"price\": number|null, \"category\": string|null, \
\"tags\": [string], \"sizes\": [string], \"sku\": string|null}. \
A descrição deve ser curta e vendedora, em português. Não invente preço: use null se não houver.";

const DEFAULT_EDIT_INSTRUCTION: &str =
    "Remova o fundo da imagem e coloque o produto sobre um fundo branco liso, com iluminação de estúdio. \
Não altere o produto.";

/// A product as read by the model, for the admin to review before saving.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductDraft {
    pub name: String,
    pub description: String,
    pub price: Option<Decimal>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub sizes: Vec<String>,
    pub sku: Option<String>,
}

/// Raw image bytes with their MIME type.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageData {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Reads a product from a free-text description, a photo, or both.
///
/// # Errors
///
/// Returns `InvalidInput` when neither is given, or `Parse` when the model
/// does not answer with a usable product.
#[instrument(skip_all, fields(has_text = text.is_some(), has_image = image.is_some()))]
pub async fn extract_product(
    model: &dyn GenerativeModel,
    text: Option<&str>,
    image: Option<&ImageData>,
) -> Result<ProductDraft, AiError> {
    let text = text.map(str::trim).filter(|t| !t.is_empty());
    if text.is_none() && image.is_none() {
        return Err(AiError::InvalidInput("send a description or a photo".to_string()));
    }

    let mut parts = Vec::new();
    if let Some(image) = image {
        parts.push(Part::image(image.mime_type.clone(), &image.bytes));
    }
    parts.push(Part::text(text.unwrap_or("Descreva o produto da foto.")));

    let request = GenerateRequest {
        contents: vec![Content::user(parts)],
        system_instruction: Some(Content::system(EXTRACT_PROMPT)),
        generation_config: Some(GenerationConfig {
            temperature: Some(0.2),
            response_mime_type: Some("application/json".to_string()),
            ..Default::default()
        }),
    };
    let response = model.generate(ModelKind::Text, request).await?;
    let text = response.text().ok_or_else(|| AiError::EmptyResponse(response.empty_reason()))?;

    let mut draft: ProductDraft = parse_json_reply(&text)?;
    draft.name = draft.name.trim().to_string();
    if draft.name.is_empty() {
        return Err(AiError::Parse("model did not identify a product name".to_string()));
    }
    draft.price = draft.price.filter(|p| *p > Decimal::ZERO);
    Ok(draft)
}

/// Edits a product photo; by default removes the background.
///
/// Returns the first image in the model's answer.
#[instrument(skip_all, fields(mime_type = %image.mime_type, size = image.bytes.len()))]
pub async fn edit_image(
    model: &dyn GenerativeModel,
    image: &ImageData,
    instruction: Option<&str>,
) -> Result<ImageData, AiError> {
    let instruction = instruction.map(str::trim).filter(|i| !i.is_empty()).unwrap_or(DEFAULT_EDIT_INSTRUCTION);
    let request = GenerateRequest {
        contents: vec![Content::user(vec![
            Part::image(image.mime_type.clone(), &image.bytes),
            Part::text(instruction),
        ])],
        system_instruction: None,
        generation_config: Some(GenerationConfig {
            response_modalities: Some(vec!["TEXT".to_string(), "IMAGE".to_string()]),
            ..Default::default()
        }),
    };
    let response = model.generate(ModelKind::Image, request).await?;
    let inline = response.first_image().ok_or_else(|| AiError::EmptyResponse(response.empty_reason()))?;
    let bytes = inline.decode().map_err(|e| AiError::Parse(format!("invalid image data: {e}")))?;
    Ok(ImageData { mime_type: inline.mime_type.clone(), bytes })
}

/// Short commentary on a margin breakdown, in Portuguese.
#[instrument(skip_all, fields(installments = breakdown.installments))]
pub async fn margin_commentary(
    model: &dyn GenerativeModel,
    product_name: Option<&str>,
    breakdown: &MarginBreakdown,
) -> Result<String, AiError> {
    let markup = breakdown.markup_percent.map_or_else(|| "sem custo informado".to_string(), |m| format!("{m}%"));
    let prompt = format!(
        "Produto: {}\nPreço de venda: {}\nCusto: {}\nMargem bruta: {} ({}%)\nMarkup: {}\n\
Taxa do cartão em {}x absorvida pela loja: {}\nMargem líquida: {}\n\n\
Em no máximo 4 frases, avalie se a precificação é saudável e sugira um ajuste se necessário.",
        product_name.unwrap_or("não informado"),
        format_brl(breakdown.price),
        format_brl(breakdown.cost),
        format_brl(breakdown.margin),
        breakdown.margin_percent,
        markup,
        breakdown.installments,
        format_brl(breakdown.card_fee),
        format_brl(breakdown.net_margin),
    );
    let request = GenerateRequest {
        contents: vec![Content::user(vec![Part::text(prompt)])],
        system_instruction: Some(Content::system("Você é um consultor financeiro de pequenos varejistas.")),
        generation_config: Some(GenerationConfig { temperature: Some(0.4), ..Default::default() }),
    };
    let response = model.generate(ModelKind::Text, request).await?;
    response.text().ok_or_else(|| AiError::EmptyResponse(response.empty_reason()))
}

/// Parses JSON the model wrote, tolerating code fences and surrounding prose.
pub fn parse_json_reply<T: DeserializeOwned>(text: &str) -> Result<T, AiError> {
    let body = strip_code_fence(text).unwrap_or(text).trim();
    let body = match (body.find('{'), body.rfind('}')) {
        (Some(start), Some(end)) if start < end => &body[start..=end],
        _ => body,
    };
    serde_json::from_str(body).map_err(|e| AiError::Parse(format!("model returned invalid JSON: {e}")))
}

fn strip_code_fence(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after = &text[start + 3..];
    // Skip the language tag line, e.g. ```json
    let body_start = after.find('\n').map_or(0, |i| i + 1);
    let body = &after[body_start..];
    let end = body.find("```").unwrap_or(body.len());
    Some(&body[..end])
}
