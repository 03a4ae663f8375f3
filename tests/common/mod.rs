#![allow(dead_code)]

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use vitrine::ai::{AiError, GenerateRequest, GenerateResponse, GenerativeModel, InlineData, ModelKind};
use vitrine::api::{self, AppState};
use vitrine::config::AppConfig;
use vitrine::db::{DocumentStore, MemoryDocumentStore};
use vitrine::realtime::EventBus;
use vitrine::settings::SettingsService;
use vitrine::storage::LocalObjectStore;

pub const TOKEN: &str = "test-admin-token";
pub const STORE: &str = "loja";

/// Model that answers text requests with a fixed reply and image requests
/// with a fixed image.
pub struct ScriptedModel {
    pub text: String,
    pub image: Option<Vec<u8>>,
    pub requests: Mutex<Vec<(ModelKind, GenerateRequest)>>,
}

impl ScriptedModel {
    pub fn text(reply: &str) -> Self {
        Self { text: reply.to_string(), image: None, requests: Mutex::new(vec![]) }
    }

    pub fn with_image(mut self, png: Vec<u8>) -> Self {
        self.image = Some(png);
        self
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    async fn generate(&self, kind: ModelKind, request: GenerateRequest) -> Result<GenerateResponse, AiError> {
        self.requests.lock().unwrap().push((kind, request));
        let part = match (kind, &self.image) {
            (ModelKind::Image, Some(png)) => json!({"inlineData": InlineData::from_bytes("image/png", png)}),
            (ModelKind::Image, None) => return Err(AiError::EmptyResponse("no image".into())),
            (ModelKind::Text, _) => json!({"text": self.text}),
        };
        Ok(serde_json::from_value(json!({"candidates": [{"content": {"role": "model", "parts": [part]}}]})).unwrap())
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub media: TempDir,
}

/// Full application over the in-memory store, with media in a temp dir.
pub fn build_test_app(model: Option<ScriptedModel>) -> TestApp {
    build_with_token(model, Some(TOKEN))
}

pub fn build_with_token(model: Option<ScriptedModel>, token: Option<&str>) -> TestApp {
    build_app(model, token, Arc::new(MemoryDocumentStore::default()))
}

pub fn build_app(model: Option<ScriptedModel>, token: Option<&str>, docs: Arc<dyn DocumentStore>) -> TestApp {
    let media = TempDir::new().unwrap();
    let mut vars = HashMap::new();
    vars.insert("MEDIA_ROOT", media.path().to_string_lossy().to_string());
    if let Some(token) = token {
        vars.insert("ADMIN_API_TOKEN", token.to_string());
    }
    let config = AppConfig::from_lookup(|key| vars.get(key).cloned()).unwrap();

    let state = AppState {
        settings: SettingsService::new(config.settings_cache_ttl),
        objects: Arc::new(LocalObjectStore::new(config.media.root.clone(), config.media.public_url.clone())),
        config: Arc::new(config),
        docs,
        bus: EventBus::new(None),
        ai: model.map(|m| Arc::new(m) as Arc<dyn GenerativeModel>),
    };
    TestApp { router: api::router(state.clone()), state, media }
}

impl TestApp {
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>, admin: bool) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if admin {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {TOKEN}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap_or(Value::Null) };
        (status, json)
    }

    pub async fn get(&self, path: &str) -> (StatusCode, Value) {
        self.request(Method::GET, &store_url(path), None, false).await
    }

    pub async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, &store_url(path), Some(body), false).await
    }

    pub async fn admin(&self, method: Method, path: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.request(method, &admin_url(path), body, true).await
    }

    /// Creates an active product and returns its id.
    pub async fn create_product(&self, name: &str, price: &str, stock: i64) -> String {
        let (status, product) = self
            .admin(
                Method::POST,
                "/products",
                Some(json!({"name": name, "price": price, "stock": stock, "status": "active", "sizes": []})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{product}");
        product["id"].as_str().unwrap().to_string()
    }

    /// Sets the store's WhatsApp number so checkout is available.
    pub async fn configure_whatsapp(&self) {
        let (status, _) = self
            .admin(Method::PATCH, "/settings", Some(json!({"store_name": "Boutique Sol", "whatsapp_number": "11 3333-4444"})))
            .await;
        assert_eq!(status, StatusCode::OK);
    }
}

pub fn store_url(path: &str) -> String {
    format!("/api/v1/stores/{STORE}{path}")
}

pub fn admin_url(path: &str) -> String {
    format!("/api/v1/admin/stores/{STORE}{path}")
}

/// Reads a decimal that was serialized as a string.
pub fn money(value: &Value) -> Decimal {
    Decimal::from_str(value.as_str().unwrap_or_else(|| panic!("not a decimal string: {value}"))).unwrap()
}

/// Multipart body with text fields and one optional file.
pub fn multipart(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> (String, Vec<u8>) {
    let boundary = "vitrine-test-boundary";
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(format!("--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n").as_bytes());
    }
    if let Some((name, filename, bytes)) = file {
        body.extend_from_slice(
            format!("--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n")
                .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={boundary}"), body)
}

pub fn multipart_request(uri: &str, content_type: String, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap()
}

/// A small opaque PNG.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 40, 90]));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}
