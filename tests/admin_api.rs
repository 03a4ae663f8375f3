//! Integration tests for the admin routes.

mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use common::{admin_url, build_test_app, build_with_token, money, multipart, multipart_request, png, ScriptedModel};
use rust_decimal::Decimal;
use serde_json::json;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Authorization
// ---------------------------------------------------------------------------

#[tokio::test]
async fn admin_requires_bearer_token() {
    let app = build_test_app(None);
    let (status, json) = app.request(Method::GET, &admin_url("/products"), None, false).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], "UNAUTHORIZED");

    let request = Request::builder()
        .uri(admin_url("/products"))
        .header(header::AUTHORIZATION, "Bearer wrong")
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.admin(Method::GET, "/products", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn admin_is_disabled_without_configured_token() {
    let app = build_with_token(None, None);
    let (status, json) = app.admin(Method::GET, "/products", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["code"], "ADMIN_DISABLED");
}

// ---------------------------------------------------------------------------
// Catalog and settings
// ---------------------------------------------------------------------------

#[tokio::test]
async fn product_lifecycle() {
    let app = build_test_app(None);
    let id = app.create_product("Camiseta", "39.90", 2).await;

    let (status, product) = app.admin(Method::POST, &format!("/products/{id}/stock"), Some(json!({"delta": -5}))).await;
    assert_eq!(status, StatusCode::CONFLICT, "{product}");
    let (status, product) = app.admin(Method::POST, &format!("/products/{id}/stock"), Some(json!({"delta": 3}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(product["stock"], 5);

    let (status, product) = app.admin(Method::POST, &format!("/products/{id}/archive"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(product["status"], "archived");
    let (_, public) = app.get("/products").await;
    assert!(public.as_array().unwrap().is_empty());

    let (status, _) = app
        .admin(Method::PUT, &format!("/products/{id}"), Some(json!({"name": "", "price": "10.00"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.admin(Method::DELETE, &format!("/products/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.admin(Method::GET, &format!("/products/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn categories_are_ordered_by_position() {
    let app = build_test_app(None);
    for (name, position) in [("Acessórios", 2), ("Moda Praia", 1)] {
        let (status, _) = app.admin(Method::POST, "/categories", Some(json!({"name": name, "position": position}))).await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (status, categories) = app.get("/categories").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(categories[0]["slug"], "moda-praia");
    assert_eq!(categories[1]["slug"], "acessorios");
}

#[tokio::test]
async fn settings_patch_merges_and_validates() {
    let app = build_test_app(None);
    let (_, public) = app.get("/settings").await;
    assert_eq!(public["store_name"], "Minha Loja");

    let (status, info) = app
        .admin(Method::PATCH, "/settings", Some(json!({"store_name": "Boutique Sol", "theme": {"primary_color": "#ff0000"}})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(info["store_name"], "Boutique Sol");
    assert_eq!(info["theme"]["primary_color"], "#ff0000");
    assert_eq!(info["theme"]["font_family"], "Inter, sans-serif");

    let (status, public) = app.get("/settings").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(public["store_name"], "Boutique Sol");

    let (status, json) = app.admin(Method::PATCH, "/settings", Some(json!({"chatbot": {"max_bubble_chars": 5}}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["code"], "INVALID_SETTINGS");

    let (status, _) = app.admin(Method::DELETE, "/settings", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, info) = app.get("/settings").await;
    assert_eq!(info["store_name"], "Minha Loja");
}

// ---------------------------------------------------------------------------
// PDV and sales
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pdv_sale_takes_stock_and_cancel_restocks() {
    let app = build_test_app(None);
    let id = app.create_product("Vestido", "50.00", 5).await;
    let (status, seller) = app
        .admin(Method::POST, "/employees", Some(json!({"name": "Bia", "commission_rate": "0.05"})))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let seller_id = seller["id"].as_str().unwrap();

    let (status, sale) = app
        .admin(
            Method::POST,
            "/pdv/sales",
            Some(json!({
                "items": [{"product_id": id, "quantity": 2}],
                "payment": {"method": "cash"},
                "cash_received": "120.00",
                "seller_id": seller_id
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{sale}");
    assert_eq!(sale["status"], "completed");
    assert_eq!(money(&sale["total"]), Decimal::new(100, 0));
    assert_eq!(money(&sale["change"]), Decimal::new(20, 0));
    let (_, product) = app.admin(Method::GET, &format!("/products/{id}"), None).await;
    assert_eq!(product["stock"], 3);

    let (status, summary) = app.admin(Method::GET, "/sales/summary", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["count"], 1);
    assert_eq!(money(&summary["by_seller"][0]["commission"]), Decimal::new(5, 0));

    let sale_id = sale["id"].as_str().unwrap();
    let (status, sale) = app.admin(Method::POST, &format!("/sales/{sale_id}/cancel"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sale["status"], "cancelled");
    let (_, product) = app.admin(Method::GET, &format!("/products/{id}"), None).await;
    assert_eq!(product["stock"], 5);

    let (status, _) = app.admin(Method::POST, &format!("/sales/{sale_id}/cancel"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, history) = app.admin(Method::GET, "/sales?status=cancelled&channel=pdv", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn pdv_rejects_quantities_that_overflow() {
    let app = build_test_app(None);
    let id = app.create_product("Vestido", "50.00", 5).await;
    let (status, json) = app
        .admin(
            Method::POST,
            "/pdv/sales",
            Some(json!({
                "items": [{"product_id": id, "quantity": u32::MAX}, {"product_id": id, "quantity": 2}],
                "payment": {"method": "pix"}
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{json}");
    let (_, product) = app.admin(Method::GET, &format!("/products/{id}"), None).await;
    assert_eq!(product["stock"], 5);
}

#[tokio::test]
async fn cancelled_sale_gives_back_the_coupon() {
    let app = build_test_app(None);
    let id = app.create_product("Vestido", "50.00", 5).await;
    app.admin(
        Method::POST,
        "/coupons",
        Some(json!({"code": "unica", "discount": {"kind": "fixed", "value": "5.00"}, "usage_limit": 1})),
    )
    .await;
    let sale = json!({"items": [{"product_id": id, "quantity": 1}], "payment": {"method": "pix"}, "coupon_code": "UNICA"});

    let (status, first) = app.admin(Method::POST, "/pdv/sales", Some(sale.clone())).await;
    assert_eq!(status, StatusCode::CREATED, "{first}");
    let (status, _) = app.admin(Method::POST, "/pdv/sales", Some(sale.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let first_id = first["id"].as_str().unwrap();
    app.admin(Method::POST, &format!("/sales/{first_id}/cancel"), None).await;
    let (_, coupon) = app.admin(Method::GET, "/coupons/UNICA", None).await;
    assert_eq!(coupon["used_count"], 0);
    let (status, _) = app.admin(Method::POST, "/pdv/sales", Some(sale)).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn pdv_rejects_short_cash_and_missing_stock() {
    let app = build_test_app(None);
    let id = app.create_product("Vestido", "50.00", 1).await;
    let sale = |qty: u32, received: &str| {
        json!({"items": [{"product_id": id, "quantity": qty}], "payment": {"method": "cash"}, "cash_received": received})
    };
    let (status, _) = app.admin(Method::POST, "/pdv/sales", Some(sale(1, "10.00"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.admin(Method::POST, "/pdv/sales", Some(sale(2, "100.00"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn online_order_is_completed_by_admin() {
    let app = build_test_app(None);
    app.configure_whatsapp().await;
    let id = app.create_product("Bolsa", "80.00", 4).await;
    app.post("/cart/s9/items", json!({"product_id": id, "quantity": 1})).await;
    let (status, result) = app
        .post(
            "/checkout",
            json!({
                "session_id": "s9", "customer_name": "Carla", "customer_phone": "21999990000",
                "delivery": {"kind": "pickup"}, "payment": {"method": "credit", "installments": 2}
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{result}");
    let sale_id = result["sale"]["id"].as_str().unwrap();

    let (status, sale) = app.admin(Method::POST, &format!("/sales/{sale_id}/complete"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sale["status"], "completed");
    let (_, product) = app.admin(Method::GET, &format!("/products/{id}"), None).await;
    assert_eq!(product["stock"], 3);

    let (_, customers) = app.admin(Method::GET, "/customers?search=carla", None).await;
    assert_eq!(customers[0]["purchases"], 1);

    let (status, _) = app.admin(Method::POST, &format!("/sales/{sale_id}/complete"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

// ---------------------------------------------------------------------------
// Coupons, customers, raffles
// ---------------------------------------------------------------------------

#[tokio::test]
async fn coupon_and_customer_crud() {
    let app = build_test_app(None);
    let (status, coupon) = app
        .admin(Method::POST, "/coupons", Some(json!({"code": "bemvinda", "discount": {"kind": "fixed", "value": "15.00"}})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(coupon["code"], "BEMVINDA");
    let (status, _) = app.admin(Method::GET, "/coupons/BEMVINDA", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.admin(Method::DELETE, "/coupons/BEMVINDA", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, customer) = app
        .admin(Method::POST, "/customers", Some(json!({"name": "Ana", "phone": "(11) 98888-7777"})))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(customer["phone"], "5511988887777");
    let (status, _) = app
        .admin(Method::POST, "/customers", Some(json!({"name": "Outra Ana", "phone": "11988887777"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn raffle_draw_picks_an_entry_once() {
    let app = build_test_app(None);
    let (_, raffle) = app.admin(Method::POST, "/raffles", Some(json!({"title": "Sorteio", "prize": "Bolsa"}))).await;
    let id = raffle["id"].as_str().unwrap();

    let (status, _) = app.admin(Method::POST, &format!("/raffles/{id}/draw"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    app.post(&format!("/raffles/{id}/entries"), json!({"name": "Ana", "phone": "11988887777"})).await;
    let (status, winner) = app.admin(Method::POST, &format!("/raffles/{id}/draw"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(winner["name"], "Ana");

    let (status, _) = app.admin(Method::POST, &format!("/raffles/{id}/draw"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

// ---------------------------------------------------------------------------
// Uploads and AI
// ---------------------------------------------------------------------------

#[tokio::test]
async fn upload_is_downscaled_stored_and_served() {
    let app = build_test_app(None);
    let (content_type, body) = multipart(&[("folder", "banners")], Some(("file", "foto.png", &png(2000, 1000))));
    let (status, object) = app.send(multipart_request(&admin_url("/uploads"), content_type, body)).await;
    assert_eq!(status, StatusCode::CREATED, "{object}");
    assert_eq!(object["width"], 1600);
    assert_eq!(object["height"], 800);
    assert_eq!(object["content_type"], "image/jpeg");
    let key = object["key"].as_str().unwrap().to_string();
    assert!(key.starts_with("loja/banners/"));
    assert!(app.media.path().join(&key).exists());

    let served = app
        .router
        .clone()
        .oneshot(Request::builder().uri(format!("/media/{key}")).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(served.status(), StatusCode::OK);

    let (status, _) = app.admin(Method::DELETE, &format!("/uploads/{key}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.admin(Method::DELETE, &format!("/uploads/{key}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.admin(Method::DELETE, "/uploads/outra/foto.jpg", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upload_rejects_non_images() {
    let app = build_test_app(None);
    let (content_type, body) = multipart(&[], Some(("file", "notas.txt", b"just some text")));
    let (status, json) = app.send(multipart_request(&admin_url("/uploads"), content_type, body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn ai_routes_need_a_model() {
    let app = build_test_app(None);
    let (content_type, body) = multipart(&[("text", "Vestido midi floral")], None);
    let (status, json) = app.send(multipart_request(&admin_url("/ai/extract-product"), content_type, body)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["code"], "AI_NOT_CONFIGURED");

    let (status, margin) = app
        .admin(Method::POST, "/ai/margin", Some(json!({"price": "100.00", "cost": "40.00", "installments": 3})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(money(&margin["card_fee"]), Decimal::new(5, 0));
    assert_eq!(money(&margin["net_margin"]), Decimal::new(55, 0));
    assert!(margin["commentary"].is_null());
}

#[tokio::test]
async fn ai_extracts_product_draft() {
    let reply = r#"```json
{"name": "Vestido Midi", "description": "Floral e leve", "price": null, "category": "Vestidos", "tags": [], "sizes": ["P", "M"], "sku": null}
```"#;
    let app = build_test_app(Some(ScriptedModel::text(reply)));
    let (content_type, body) = multipart(&[("text", "Vestido midi floral, P e M")], None);
    let (status, draft) = app.send(multipart_request(&admin_url("/ai/extract-product"), content_type, body)).await;
    assert_eq!(status, StatusCode::OK, "{draft}");
    assert_eq!(draft["name"], "Vestido Midi");
    assert_eq!(draft["sizes"], json!(["P", "M"]));

    let (content_type, body) = multipart(&[], None);
    let (status, _) = app.send(multipart_request(&admin_url("/ai/extract-product"), content_type, body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn ai_edited_image_is_stored() {
    let app = build_test_app(Some(ScriptedModel::text("ok").with_image(png(64, 64))));
    let (content_type, body) = multipart(&[("instruction", "fundo branco")], Some(("image", "foto.png", &png(32, 32))));
    let (status, object) = app.send(multipart_request(&admin_url("/ai/edit-image"), content_type, body)).await;
    assert_eq!(status, StatusCode::CREATED, "{object}");
    assert_eq!(object["width"], 64);
    assert!(app.media.path().join(object["key"].as_str().unwrap()).exists());
}

#[tokio::test]
async fn margin_includes_model_commentary() {
    let app = build_test_app(Some(ScriptedModel::text("Margem saudável.")));
    let (status, margin) = app
        .admin(Method::POST, "/ai/margin", Some(json!({"price": "100.00", "cost": "40.00"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(margin["commentary"], "Margem saudável.");
    assert_eq!(money(&margin["margin_percent"]), Decimal::new(60, 0));
}

// ---------------------------------------------------------------------------
// Analytics and events
// ---------------------------------------------------------------------------

#[tokio::test]
async fn analytics_summary_counts_events() {
    let app = build_test_app(None);
    for kind in ["page_view", "product_view", "product_view"] {
        app.post("/analytics", json!({"kind": kind, "session_id": "s1", "product_id": "p1"})).await;
    }
    let (status, summary) = app.admin(Method::GET, "/analytics/summary?days=7", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["total"], 3);
    assert_eq!(summary["by_kind"]["product_view"], 2);
    assert_eq!(summary["top_products"][0]["views"], 2);
}

#[tokio::test]
async fn events_endpoint_streams_sse() {
    let app = build_test_app(None);
    let request = Request::builder()
        .uri(admin_url("/events"))
        .header(header::AUTHORIZATION, format!("Bearer {}", common::TOKEN))
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");
}
