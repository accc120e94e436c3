//! Cart flows through the real router.
//!
//! The commerce API is a `wiremock` server; the cart itself lives in the
//! session, so every request in a test shares the client's cookie.

#![allow(clippy::unwrap_used)]

use autoparts_integration_tests::{TestApp, location, product_json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

async fn mount_product(app: &TestApp, id: u64, name: &str, price: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/wc/v3/products/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(product_json(id, name, price)))
        .mount(&app.commerce)
        .await;
}

async fn cart_count(app: &TestApp) -> String {
    app.page("/cart/count").await
}

#[tokio::test]
async fn test_add_to_cart_shows_line_and_count() {
    let app = TestApp::spawn().await;
    mount_product(&app, 101, "Brake pad set", "150000").await;

    let response = app
        .post_form("/cart/add", &[("product_id", "101"), ("quantity", "2")])
        .await;
    assert_eq!(response.status(), 303);
    assert_eq!(location(&response), "/cart");

    let body = app.page("/cart").await;
    assert!(body.contains("Brake pad set"));
    assert!(body.contains("300,000 IRR"));
    assert!(body.contains("Brake pad set was added to your cart."));

    let count = cart_count(&app).await;
    assert!(count.contains(">2</span>"), "{count}");
    assert!(!count.contains("hidden"));
}

#[tokio::test]
async fn test_adding_same_product_merges_quantities() {
    let app = TestApp::spawn().await;
    mount_product(&app, 101, "Brake pad set", "150000").await;

    app.post_form("/cart/add", &[("product_id", "101")]).await;
    app.post_form("/cart/add", &[("product_id", "101"), ("quantity", "2")])
        .await;

    let body = app.page("/cart").await;
    assert!(body.contains("value=\"3\""));
    assert!(body.contains("450,000 IRR"));
    assert!(cart_count(&app).await.contains(">3</span>"));
}

#[tokio::test]
async fn test_update_and_remove_lines() {
    let app = TestApp::spawn().await;
    mount_product(&app, 101, "Brake pad set", "150000").await;
    mount_product(&app, 202, "Oil filter", "45000").await;

    app.post_form("/cart/add", &[("product_id", "101")]).await;
    app.post_form("/cart/add", &[("product_id", "202")]).await;

    let response = app
        .post_form("/cart/update", &[("product_id", "202"), ("quantity", "4")])
        .await;
    assert_eq!(response.status(), 303);
    assert!(cart_count(&app).await.contains(">5</span>"));

    app.post_form("/cart/remove", &[("product_id", "101")]).await;
    let body = app.page("/cart").await;
    assert!(!body.contains("Brake pad set"));
    assert!(body.contains("Oil filter"));
    assert!(body.contains("180,000 IRR"));
}

#[tokio::test]
async fn test_clear_empties_cart() {
    let app = TestApp::spawn().await;
    mount_product(&app, 101, "Brake pad set", "150000").await;

    app.post_form("/cart/add", &[("product_id", "101")]).await;
    app.post_form("/cart/clear", &[("confirm", "1")]).await;

    let body = app.page("/cart").await;
    assert!(body.contains("Your cart is empty."));
    assert!(cart_count(&app).await.contains("hidden"));
}

#[tokio::test]
async fn test_unknown_product_leaves_cart_untouched() {
    let app = TestApp::spawn().await;
    Mock::given(method("GET"))
        .and(path("/wc/v3/products/999"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "code": "woocommerce_rest_product_invalid_id",
            "message": "Invalid ID."
        })))
        .mount(&app.commerce)
        .await;

    let response = app.post_form("/cart/add", &[("product_id", "999")]).await;
    assert_eq!(response.status(), 303);

    let body = app.page("/cart").await;
    assert!(body.contains("notice--error"));
    assert!(body.contains("Your cart is empty."));
}

#[tokio::test]
async fn test_out_of_stock_product_is_refused() {
    let app = TestApp::spawn().await;
    let mut product = product_json(303, "Timing belt", "220000");
    product["stock_status"] = "outofstock".into();
    Mock::given(method("GET"))
        .and(path("/wc/v3/products/303"))
        .respond_with(ResponseTemplate::new(200).set_body_json(product))
        .mount(&app.commerce)
        .await;

    let response = app.post_form("/cart/add", &[("product_id", "303")]).await;
    assert_eq!(location(&response), "/product/303");
    assert!(cart_count(&app).await.contains("hidden"));
}

#[tokio::test]
async fn test_coupon_is_rejected_with_message() {
    let app = TestApp::spawn().await;

    let response = app.post_form("/cart/coupon", &[("code", "SAVE10")]).await;
    assert_eq!(location(&response), "/cart");

    let body = app.page("/cart").await;
    assert!(body.contains("notice--error"));
}
