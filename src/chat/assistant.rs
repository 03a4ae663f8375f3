//! Conversation with the storefront assistant.
//!
//! Each reply is generated from a system prompt describing the store and its
//! active catalog plus the most recent messages of the session. Replies are
//! stored whole and split into bubbles for display.

use std::fmt::Write;
use std::time::Duration;

use serde::Serialize;

use super::segmenter::segment;
use crate::ai::{AiError, Content, GenerateRequest, GenerationConfig, GenerativeModel, ModelKind, Part};
use crate::db::Tenant;
use crate::domain::aggregates::{ChatMessage, ChatRole, ChatThread, Product};
use crate::format::format_brl;
use crate::services::cart::check_session;
use crate::services::catalog::{self, ProductFilter};
use crate::services::{ServiceError, ServiceResult};
use crate::settings::SiteInfo;

/// How long the storefront waits for a generated greeting.
pub const GREETING_TIMEOUT: Duration = Duration::from_secs(4);

const MAX_MESSAGE_CHARS: usize = 2000;
const MAX_PROMPT_PRODUCTS: usize = 60;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Greeting {
    pub text: String,
    pub bubbles: Vec<String>,
    /// `false` when the configured greeting was used.
    pub generated: bool,
}

async fn load_thread(tenant: &Tenant, session_id: &str) -> ServiceResult<ChatThread> {
    check_session(session_id)?;
    Ok(tenant.repo::<ChatThread>().get(session_id).await?.unwrap_or_else(|| ChatThread::new(session_id)))
}

/// Messages of a session, oldest first.
pub async fn history(tenant: &Tenant, session_id: &str) -> ServiceResult<Vec<ChatMessage>> {
    Ok(load_thread(tenant, session_id).await?.into_messages())
}

/// Answers `text` and stores both sides of the exchange.
pub async fn reply(
    tenant: &Tenant,
    info: &SiteInfo,
    model: &dyn GenerativeModel,
    session_id: &str,
    text: &str,
    history_limit: usize,
) -> ServiceResult<ChatMessage> {
    if !info.chatbot.enabled {
        return Err(ServiceError::Unavailable("the assistant is disabled for this store".into()));
    }
    let text = text.trim();
    if text.is_empty() || text.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ServiceError::Validation(format!("message must have 1 to {MAX_MESSAGE_CHARS} characters")));
    }

    let mut thread = load_thread(tenant, session_id).await?;
    let products = catalog::list_public(tenant, &ProductFilter::default()).await?;

    let mut contents: Vec<Content> = thread
        .recent(history_limit)
        .iter()
        .map(|m| match m.role {
            ChatRole::User => Content::user(vec![Part::text(m.content.clone())]),
            ChatRole::Assistant => Content::model(m.content.clone()),
        })
        .collect();
    contents.push(Content::user(vec![Part::text(text)]));

    let request = GenerateRequest {
        contents,
        system_instruction: Some(Content::system(system_prompt(info, &products))),
        generation_config: Some(GenerationConfig { temperature: Some(0.7), ..Default::default() }),
    };
    let response = model.generate(ModelKind::Text, request).await?;
    let answer = response.text().ok_or_else(|| AiError::EmptyResponse(response.empty_reason()))?;
    let answer = answer.trim();

    let bubbles = segment(answer, info.chatbot.max_bubble_chars);
    thread.push(ChatMessage::user(session_id, text));
    let message = ChatMessage::assistant(session_id, answer, bubbles);
    thread.push(message.clone());
    tenant.repo::<ChatThread>().save(&thread).await?;
    tracing::debug!(store = %tenant.id(), session_id, bubbles = message.bubbles.len(), "assistant replied");
    Ok(message)
}

/// Opening message of the chat widget.
///
/// Asks the model for a short greeting and falls back to the configured one
/// when the model is missing, fails or takes longer than [`GREETING_TIMEOUT`].
pub async fn greeting(info: &SiteInfo, model: Option<&dyn GenerativeModel>) -> Greeting {
    let fallback = || Greeting {
        text: info.chatbot.greeting.clone(),
        bubbles: segment(&info.chatbot.greeting, info.chatbot.max_bubble_chars),
        generated: false,
    };
    let Some(model) = model.filter(|_| info.chatbot.enabled) else {
        return fallback();
    };

    let request = GenerateRequest {
        contents: vec![Content::user(vec![Part::text(
            "Cumprimente o cliente que acabou de abrir o chat, em uma ou duas frases curtas.",
        )])],
        system_instruction: Some(Content::system(persona(info))),
        generation_config: Some(GenerationConfig { temperature: Some(0.9), max_output_tokens: Some(120), ..Default::default() }),
    };
    match tokio::time::timeout(GREETING_TIMEOUT, model.generate(ModelKind::Text, request)).await {
        Ok(Ok(response)) => match response.text().map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) {
            Some(text) => Greeting {
                bubbles: segment(&text, info.chatbot.max_bubble_chars),
                text,
                generated: true,
            },
            None => fallback(),
        },
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "greeting generation failed");
            fallback()
        }
        Err(_) => {
            tracing::warn!(timeout_secs = GREETING_TIMEOUT.as_secs(), "greeting generation timed out");
            fallback()
        }
    }
}

fn persona(info: &SiteInfo) -> String {
    format!(
        "{} Seu nome é {} e você atende a loja {}. Responda sempre em português do Brasil, \
de forma breve e calorosa, como em uma conversa de WhatsApp.",
        info.chatbot.persona, info.chatbot.assistant_name, info.store_name
    )
}

/// Store description, payment policy and catalog given to the model.
pub fn system_prompt(info: &SiteInfo, products: &[Product]) -> String {
    let mut prompt = persona(info);
    prompt.push_str("\n\n");
    if !info.tagline.is_empty() {
        let _ = writeln!(prompt, "Sobre a loja: {}", info.tagline);
    }
    if let Some(address) = &info.address {
        let _ = writeln!(prompt, "Endereço: {address}");
    }

    let mut payment = vec!["Pix".to_string(), "dinheiro".to_string()];
    if info.payment.accepts_card {
        payment.push(format!("cartão em até {}x", info.installments.max_installments));
    }
    let _ = writeln!(prompt, "Formas de pagamento: {}.", payment.join(", "));
    if !info.payment.cash_discount_percent.is_zero() {
        let _ = writeln!(prompt, "Pagamentos em Pix ou dinheiro têm {}% de desconto.", info.payment.cash_discount_percent.normalize());
    }
    if let Some((n, _)) = info.installments.rates.iter().filter(|(_, rate)| rate.is_zero()).max_by_key(|(n, _)| **n) {
        if *n > 1 {
            let _ = writeln!(prompt, "Parcelamos sem juros em até {n}x.");
        }
    }

    let _ = writeln!(prompt, "\nProdutos disponíveis:");
    if products.is_empty() {
        let _ = writeln!(prompt, "(nenhum produto cadastrado no momento)");
    }
    for product in products.iter().take(MAX_PROMPT_PRODUCTS) {
        let _ = write!(prompt, "- {}: {}", product.name(), format_brl(product.effective_price()));
        if product.promotional_price().is_some() {
            let _ = write!(prompt, " (de {})", format_brl(product.price()));
        }
        if !product.sizes().is_empty() {
            let _ = write!(prompt, "; tamanhos {}", product.sizes().join("/"));
        }
        let _ = writeln!(prompt, "{}", if product.is_in_stock() { "" } else { "; esgotado" });
    }
    prompt.push_str(
        "\nRecomende apenas produtos da lista. Para finalizar a compra, oriente o cliente a \
adicionar os produtos ao carrinho e concluir o pedido pelo WhatsApp.",
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::GenerateResponse;
    use crate::db::MemoryDocumentStore;
    use crate::domain::aggregates::{ProductInput, ProductStatus};
    use crate::domain::value_objects::StoreId;
    use crate::realtime::EventBus;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    struct FakeModel {
        reply: String,
        delay: Option<Duration>,
        requests: Mutex<Vec<GenerateRequest>>,
    }

    impl FakeModel {
        fn new(reply: &str) -> Self {
            Self { reply: reply.into(), delay: None, requests: Mutex::new(vec![]) }
        }
    }

    #[async_trait]
    impl GenerativeModel for FakeModel {
        async fn generate(&self, _kind: ModelKind, request: GenerateRequest) -> Result<GenerateResponse, AiError> {
            self.requests.lock().unwrap().push(request);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(serde_json::from_value(json!({"candidates": [{"content": {"role": "model", "parts": [{"text": self.reply}]}}]})).unwrap())
        }
    }

    fn tenant() -> Tenant {
        Tenant::new(StoreId::new("loja").unwrap(), Arc::new(MemoryDocumentStore::default()), EventBus::new(None))
    }

    #[tokio::test]
    async fn test_reply_is_segmented_and_persisted() {
        let t = tenant();
        let mut info = SiteInfo::default();
        info.chatbot.max_bubble_chars = 40;
        let model = FakeModel::new("Temos sim! O vestido floral custa R$ 89,90. Quer ver as cores? 😊");

        let message = reply(&t, &info, &model, "s1", "Tem vestido?", 20).await.unwrap();
        assert_eq!(message.role, ChatRole::Assistant);
        assert_eq!(message.bubbles, vec!["Temos sim!", "O vestido floral custa R$ 89,90.", "Quer ver as cores? 😊"]);

        let stored = history(&t, "s1").await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].role, ChatRole::User);
        assert_eq!(stored[0].content, "Tem vestido?");
        assert!(history(&t, "s2").await.unwrap().is_empty());

        reply(&t, &info, &model, "s2", "Oi", 20).await.unwrap();
        let thread = t.repo::<ChatThread>().get("s1").await.unwrap().unwrap();
        assert_eq!(thread.messages().len(), 2);
        assert_eq!(t.repo::<ChatThread>().list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_history_is_limited() {
        let t = tenant();
        let info = SiteInfo::default();
        let model = FakeModel::new("Ok!");
        for i in 0..3 {
            reply(&t, &info, &model, "s1", &format!("pergunta {i}"), 2).await.unwrap();
        }
        let requests = model.requests.lock().unwrap();
        // Two past messages plus the new question.
        assert_eq!(requests[2].contents.len(), 3);
        assert_eq!(requests[0].contents.len(), 1);
    }

    #[tokio::test]
    async fn test_prompt_lists_active_catalog() {
        let t = tenant();
        let input = ProductInput { name: "Sandália Couro".into(), price: Decimal::new(12990, 2), stock: 2, sizes: vec!["36".into(), "37".into()], status: Some(ProductStatus::Active), ..Default::default() };
        catalog::create(&t, &input).await.unwrap();
        let model = FakeModel::new("Temos!");
        reply(&t, &SiteInfo::default(), &model, "s1", "Sandálias?", 20).await.unwrap();

        let requests = model.requests.lock().unwrap();
        let system = requests[0].system_instruction.as_ref().unwrap().parts[0].text.clone().unwrap();
        assert!(system.contains("- Sandália Couro: R$ 129,90; tamanhos 36/37"));
        assert!(system.contains("cartão em até 12x"));
    }

    #[tokio::test]
    async fn test_disabled_assistant() {
        let mut info = SiteInfo::default();
        info.chatbot.enabled = false;
        let err = reply(&tenant(), &info, &FakeModel::new("x"), "s1", "oi", 20).await.unwrap_err();
        assert!(matches!(err, ServiceError::Unavailable(_)));
        assert!(!greeting(&info, Some(&FakeModel::new("Oi!"))).await.generated);
    }

    #[tokio::test]
    async fn test_generated_greeting() {
        let g = greeting(&SiteInfo::default(), Some(&FakeModel::new("Oi! Seja bem-vinda."))).await;
        assert!(g.generated);
        assert_eq!(g.text, "Oi! Seja bem-vinda.");
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_greeting_falls_back() {
        let model = FakeModel { delay: Some(Duration::from_secs(10)), ..FakeModel::new("tarde demais") };
        let info = SiteInfo::default();
        let g = greeting(&info, Some(&model)).await;
        assert!(!g.generated);
        assert_eq!(g.text, info.chatbot.greeting);
    }

    #[tokio::test]
    async fn test_greeting_without_model() {
        let g = greeting(&SiteInfo::default(), None).await;
        assert_eq!(g.bubbles, vec![SiteInfo::default().chatbot.greeting]);
    }
}
