//! End-to-end checkout flows over HTTP.

#![allow(clippy::unwrap_used)]

use serde_json::json;

use sokoni_core::{ProductId, SaleId};
use sokoni_integration_tests::{TestContext, checkout_form};

#[tokio::test]
async fn test_checkout_summary_matches_scenario() {
    let ctx = TestContext::new().await;
    let token = ctx.csrf_token().await;

    ctx.client
        .post(ctx.url("/cart"))
        .json(&json!({
            "action": "add",
            "product_id": 2,
            "quantity": 2,
            "csrf_token": token
        }))
        .send()
        .await
        .unwrap();

    let summary: serde_json::Value = ctx
        .client
        .get(ctx.url("/checkout"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(summary["subtotal"].as_f64().unwrap(), 3000.0);
    assert_eq!(summary["shipping"].as_f64().unwrap(), 10.0);
    assert_eq!(summary["coupon_discount"].as_f64().unwrap(), 0.0);
    assert_eq!(summary["total"].as_f64().unwrap(), 3010.0);
}

#[tokio::test]
async fn test_checkout_of_empty_cart_is_rejected() {
    let ctx = TestContext::new().await;
    let token = ctx.csrf_token().await;

    let mut form = checkout_form();
    form["csrf_token"] = json!(token);

    let response = ctx
        .client
        .post(ctx.url("/checkout"))
        .json(&form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Cart is empty");
}

#[tokio::test]
async fn test_checkout_validation_collects_all_violations() {
    let ctx = TestContext::new().await;
    let token = ctx.csrf_token().await;

    ctx.client
        .post(ctx.url("/cart"))
        .json(&json!({
            "action": "add",
            "product_id": 2,
            "quantity": 1,
            "csrf_token": token
        }))
        .send()
        .await
        .unwrap();

    let response = ctx
        .client
        .post(ctx.url("/checkout"))
        .json(&json!({
            "billing-first-name": "Asha",
            "billing-email": "not-an-email",
            "csrf_token": token
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Validation failed");
    let details: Vec<String> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d.as_str().unwrap().to_string())
        .collect();
    assert!(details.contains(&"Last Name is required.".to_string()));
    assert!(details.contains(&"Please enter a valid email address.".to_string()));
    assert!(details.contains(&"Please select a payment method.".to_string()));
    assert!(details.len() >= 5);
}

#[tokio::test]
async fn test_successful_checkout_clears_cart_and_discount() {
    let ctx = TestContext::new().await;
    let token = ctx.csrf_token().await;

    ctx.client
        .post(ctx.url("/cart"))
        .json(&json!({
            "action": "add",
            "product_id": 2,
            "quantity": 2,
            "csrf_token": token
        }))
        .send()
        .await
        .unwrap();
    ctx.client
        .post(ctx.url("/coupon"))
        .json(&json!({"code": "SAVE10", "csrf_token": token}))
        .send()
        .await
        .unwrap();

    let mut form = checkout_form();
    form["csrf_token"] = json!(token);

    let response = ctx
        .client
        .post(ctx.url("/checkout"))
        .json(&form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["sale_id"], 1);
    assert_eq!(body["message"], "Order placed successfully");

    // The cart and discount are gone.
    let cart = ctx.fetch_cart().await;
    assert_eq!(cart["cart"].as_array().unwrap().len(), 0);
    let summary: serde_json::Value = ctx
        .client
        .get(ctx.url("/checkout"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(summary["coupon_discount"].as_f64().unwrap(), 0.0);

    // The sale was recorded with the discounted total and stock went down.
    let sale = ctx.state.ledger().sale(SaleId::new(1)).unwrap();
    assert_eq!(sale.total.to_string(), "3000");
    assert_eq!(ctx.state.ledger().available(ProductId::new(2)), 98);
}

#[tokio::test]
async fn test_checkout_with_insufficient_stock_is_rejected() {
    let ctx = TestContext::new().await;
    let token = ctx.csrf_token().await;

    // Two variants of the same product; each add passes the per-call stock
    // check, but together they exceed the 100 in stock at placement time.
    for size in ["M", "L"] {
        ctx.client
            .post(ctx.url("/cart"))
            .json(&json!({
                "action": "add",
                "product_id": 2,
                "quantity": 60,
                "size": size,
                "csrf_token": token
            }))
            .send()
            .await
            .unwrap();
    }

    let mut form = checkout_form();
    form["csrf_token"] = json!(token);

    let response = ctx
        .client
        .post(ctx.url("/checkout"))
        .json(&form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Insufficient stock for Blue Jacket");

    // Nothing was committed: the cart survives and stock is untouched.
    assert_eq!(ctx.state.ledger().available(ProductId::new(2)), 100);
    let cart = ctx.fetch_cart().await;
    assert_eq!(cart["cart"].as_array().unwrap().len(), 2);
}
