//! Integration tests for the simulated checkout flow.

use std::time::Duration;

use axum::http::StatusCode;
use moodeng_core::analytics::EventName;
use moodeng_integration_tests::{TestApp, dec, decimal};
use serde_json::{Value, json};

fn checkout_form() -> Value {
    json!({
        "email": "Shopper@Example.com",
        "phone": "555-0100",
        "first_name": "Moo",
        "last_name": "Deng",
        "address": "1 Khao Kheow",
        "apartment": "",
        "city": "Chonburi",
        "state": "CB",
        "zip": "20110"
    })
}

async fn add(app: &mut TestApp, product_id: &str, quantity: u32) {
    let (status, _) = app
        .post_json(
            "/api/cart/add",
            &json!({ "product_id": product_id, "quantity": quantity }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

// =============================================================================
// Begin
// =============================================================================

#[tokio::test]
async fn test_begin_with_empty_cart_is_rejected() {
    let mut app = TestApp::new();
    let (status, body) = app.post_json("/api/checkout/begin", &json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "cart is empty");
    assert!(app.sink().events().is_empty());
}

#[tokio::test]
async fn test_begin_returns_totals_with_tax() {
    let mut app = TestApp::new();
    add(&mut app, "5", 1).await;

    let (status, body) = app.post_json("/api/checkout/begin", &json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["item_count"], 1);
    assert_eq!(decimal(&body["totals"]["subtotal"]), dec("19"));
    assert_eq!(decimal(&body["totals"]["shipping"]), dec("5.99"));
    assert_eq!(decimal(&body["totals"]["tax"]), dec("1.52"));
    assert_eq!(decimal(&body["totals"]["total"]), dec("26.51"));
    assert_eq!(body["display_total"], "$26.51");

    assert_eq!(
        app.sink().names(),
        vec![EventName::AddToCart, EventName::InitiateCheckout]
    );
}

// =============================================================================
// Submit
// =============================================================================

#[tokio::test]
async fn test_submit_validates_details() {
    let mut app = TestApp::new();
    add(&mut app, "2", 1).await;

    let mut form = checkout_form();
    form["email"] = json!("not-an-email");
    let (status, _) = app.post_json("/api/checkout", &form).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut form = checkout_form();
    form["first_name"] = json!("   ");
    let (status, body) = app.post_json("/api/checkout", &form).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "first_name is required");

    let (_, body) = app.get("/api/cart/count").await;
    assert_eq!(body["count"], 1);
}

#[tokio::test]
async fn test_submit_with_empty_cart_is_rejected() {
    let mut app = TestApp::new();
    let (status, _) = app.post_json("/api/checkout", &checkout_form()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_submit_points_to_success_step() {
    let mut app = TestApp::new();
    add(&mut app, "2", 1).await;

    let (status, body) = app.post_json("/api/checkout", &checkout_form()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["next"], "/checkout/success");
    assert_eq!(decimal(&body["totals"]["total"]), dec("63.72"));
    assert_eq!(body["customer"]["firstName"], "Moo");
    assert!(body["shipping"].get("apartment").is_none());

    // Cart is kept until the order completes.
    let (_, body) = app.get("/api/cart/count").await;
    assert_eq!(body["count"], 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_add_during_submit_delay_is_kept() {
    let mut app = TestApp::with_checkout_delay(Duration::from_millis(200));
    add(&mut app, "2", 1).await;

    let results = app
        .post_json_concurrently(&[
            ("/api/checkout", checkout_form()),
            ("/api/cart/add", json!({ "product_id": "4" })),
            ("/api/wishlist/add", json!({ "product_id": "7" })),
        ])
        .await;
    assert!(results.iter().all(|(status, _)| *status == StatusCode::OK));

    let (_, cart) = app.get("/api/cart").await;
    assert_eq!(cart["items"].as_array().map(Vec::len), Some(2));
    let (_, wishlist) = app.get("/api/wishlist").await;
    assert_eq!(wishlist["count"], 1);

    let (status, body) = app.post_json("/api/checkout/complete", &json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["customer"]["firstName"], "Moo");
    assert_eq!(body["items"].as_array().map(Vec::len), Some(2));
}

// =============================================================================
// Complete
// =============================================================================

#[tokio::test]
async fn test_full_checkout_flow() {
    let mut app = TestApp::new();
    add(&mut app, "2", 1).await;
    add(&mut app, "4", 2).await;

    app.post_json("/api/checkout/begin", &json!({})).await;
    let (_, submitted) = app.post_json("/api/checkout", &checkout_form()).await;

    let (status, body) = app.post_json("/api/checkout/complete", &json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let order_id = body["order_id"].as_str().unwrap_or_default();
    assert!(order_id.starts_with("ORD-"));
    assert_eq!(body["items"].as_array().map(Vec::len), Some(2));
    assert_eq!(
        decimal(&body["display_total"]),
        decimal(&submitted["totals"]["total"])
    );
    assert_eq!(body["customer"]["email"], "Shopper@Example.com");
    assert_eq!(body["shipping"]["city"], "Chonburi");

    let (_, cart) = app.get("/api/cart/count").await;
    assert_eq!(cart["count"], 0);

    assert_eq!(
        app.sink().names(),
        vec![
            EventName::AddToCart,
            EventName::AddToCart,
            EventName::InitiateCheckout,
            EventName::InitiateCheckout,
            EventName::Purchase,
        ]
    );

    let purchase = app.sink().events().pop();
    let purchase = purchase.as_ref();
    assert_eq!(
        purchase.and_then(|e| e.order_id.as_ref()).map(|id| id.as_str().to_string()),
        Some(order_id.to_string())
    );
    assert_eq!(purchase.and_then(|e| e.num_items), Some(3));
    let hashed_email = purchase
        .and_then(|e| e.user_data.as_ref())
        .and_then(|u| u.em.clone())
        .unwrap_or_default();
    assert_eq!(hashed_email.len(), 64);
    assert!(!hashed_email.contains('@'));
}

#[tokio::test]
async fn test_complete_without_details_uses_cart_totals() {
    let mut app = TestApp::new();
    add(&mut app, "5", 1).await;

    let (status, body) = app.post_json("/api/checkout/complete", &json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&body["display_total"]), dec("26.51"));
    assert_eq!(body["display_total_formatted"], "$26.51");
    assert!(body.get("customer").is_none());

    let purchase = app.sink().events().pop();
    assert!(purchase.is_some_and(|e| e.name == EventName::Purchase && e.user_data.is_none()));
}

#[tokio::test]
async fn test_complete_twice_is_rejected() {
    let mut app = TestApp::new();
    add(&mut app, "1", 1).await;
    app.post_json("/api/checkout", &checkout_form()).await;

    let (status, _) = app.post_json("/api/checkout/complete", &json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.post_json("/api/checkout/complete", &json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "no order to complete");

    let purchases = app
        .sink()
        .names()
        .into_iter()
        .filter(|n| *n == EventName::Purchase)
        .count();
    assert_eq!(purchases, 1);
}
