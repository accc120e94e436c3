//! Checkout flows: validation, order placement, payment retry and
//! duplicate-order prevention.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use autoparts_integration_tests::{TestApp, checkout_form, location, order_json, product_json};
use autoparts_storefront::commerce::IDEMPOTENCY_HEADER;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};

async fn fill_cart(app: &TestApp) {
    Mock::given(method("GET"))
        .and(path("/wc/v3/products/101"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(product_json(101, "Brake pad set", "150000")),
        )
        .mount(&app.commerce)
        .await;
    let response = app
        .post_form("/cart/add", &[("product_id", "101"), ("quantity", "2")])
        .await;
    assert_eq!(response.status(), 303);
}

async fn mount_order_updates(app: &TestApp) {
    Mock::given(method("GET"))
        .and(path("/wc/v3/orders/1042"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(order_json(1042, "300000", "novino", "")),
        )
        .mount(&app.commerce)
        .await;
    Mock::given(method("PUT"))
        .and(path("/wc/v3/orders/1042"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(order_json(1042, "300000", "novino", "")),
        )
        .mount(&app.commerce)
        .await;
}

fn order_creations(requests: &[wiremock::Request]) -> usize {
    requests
        .iter()
        .filter(|r| r.method.as_str() == "POST" && r.url.path() == "/wc/v3/orders")
        .count()
}

/// POST a form and give up before the storefront answers.
async fn post_and_disconnect(app: &TestApp, path: &str, form: &[(&str, String)]) {
    let result = app
        .client
        .post(app.url(path))
        .form(form)
        .timeout(Duration::from_millis(200))
        .send()
        .await;
    assert!(result.unwrap_err().is_timeout());
}

fn payment_requests(requests: &[wiremock::Request]) -> Vec<&wiremock::Request> {
    requests
        .iter()
        .filter(|r| r.url.path() == "/gateway/payments")
        .collect()
}

#[tokio::test]
async fn test_checkout_with_empty_cart_redirects_to_cart() {
    let app = TestApp::spawn().await;

    let response = app.get("/checkout").await;
    assert_eq!(response.status(), 303);
    assert_eq!(location(&response), "/cart");
}

#[tokio::test]
async fn test_invalid_form_is_rejected_without_calling_api() {
    let app = TestApp::spawn().await;
    fill_cart(&app).await;
    Mock::given(method("POST"))
        .and(path("/wc/v3/orders"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&app.commerce)
        .await;

    let mut form = checkout_form("gateway");
    form.retain(|(k, _)| *k != "email");
    form.push(("email", "not-an-email".to_owned()));

    let response = app.post_form("/checkout", &form).await;
    assert_eq!(response.status(), 422);
    let body = response.text().await.unwrap();
    assert!(body.contains("field-error"));
    assert!(body.contains("value=\"not-an-email\""));
    assert!(body.contains("value=\"Sara\""));
}

#[tokio::test]
async fn test_cash_on_delivery_confirms_and_clears_cart() {
    let app = TestApp::spawn().await;
    fill_cart(&app).await;
    Mock::given(method("POST"))
        .and(path("/wc/v3/orders"))
        .and(body_partial_json(serde_json::json!({
            "payment_method": "cod",
            "set_paid": false,
            "line_items": [{ "product_id": 101, "quantity": 2 }]
        })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(order_json(1042, "300000", "cod", "")),
        )
        .expect(1)
        .mount(&app.commerce)
        .await;

    let response = app.post_form("/checkout", &checkout_form("cod")).await;
    assert_eq!(response.status(), 303);
    assert_eq!(location(&response), "/checkout/confirmation");

    let body = app.page("/checkout/confirmation").await;
    assert!(body.contains("#1042"));
    assert!(body.contains("300,000 IRR"));
    assert!(body.contains("exact amount ready"));

    assert!(app.page("/cart/count").await.contains("hidden"));
    assert!(app.gateway.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_payment_failure_then_retry_succeeds() {
    let app = TestApp::spawn().await;
    fill_cart(&app).await;
    mount_order_updates(&app).await;
    Mock::given(method("POST"))
        .and(path("/wc/v3/orders"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(order_json(1042, "300000", "novino", "")),
        )
        .expect(1)
        .mount(&app.commerce)
        .await;
    Mock::given(method("POST"))
        .and(path("/gateway/payments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": false,
            "message": "Card declined by issuer"
        })))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&app.gateway)
        .await;
    Mock::given(method("POST"))
        .and(path("/gateway/payments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "reference": "REF-77"
        })))
        .mount(&app.gateway)
        .await;

    let response = app.post_form("/checkout", &checkout_form("gateway")).await;
    assert_eq!(location(&response), "/checkout/payment");
    let body = app.page("/checkout/payment").await;
    assert!(body.contains("#1042"));

    let response = app.post_form("/checkout/payment", &[("pay", "1")]).await;
    assert_eq!(location(&response), "/checkout/payment");
    let body = app.page("/checkout/payment").await;
    assert!(body.contains("Card declined by issuer"));
    assert!(body.contains("Try payment again"));
    assert!(app.page("/cart/count").await.contains(">2</span>"));

    let response = app.post_form("/checkout/payment", &[("pay", "1")]).await;
    assert_eq!(location(&response), "/checkout/confirmation");
    let body = app.page("/checkout/confirmation").await;
    assert!(body.contains("REF-77"));
    assert!(app.page("/cart/count").await.contains("hidden"));

    let requests = app.gateway.received_requests().await.unwrap();
    let payments = payment_requests(&requests);
    assert_eq!(payments.len(), 2);
    assert_eq!(payments[0].body, payments[1].body);
}

#[tokio::test]
async fn test_double_submit_creates_one_order() {
    let app = TestApp::spawn().await;
    fill_cart(&app).await;
    Mock::given(method("POST"))
        .and(path("/wc/v3/orders"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(order_json(1042, "300000", "novino", "")),
        )
        .expect(1)
        .mount(&app.commerce)
        .await;

    let first = app.post_form("/checkout", &checkout_form("gateway")).await;
    assert_eq!(location(&first), "/checkout/payment");

    let second = app.post_form("/checkout", &checkout_form("gateway")).await;
    assert_eq!(location(&second), "/checkout/payment");

    let response = app.get("/checkout").await;
    assert_eq!(location(&response), "/checkout/payment");
}

#[tokio::test]
async fn test_resubmission_after_failure_reuses_created_order() {
    let app = TestApp::spawn().await;
    fill_cart(&app).await;
    Mock::given(method("POST"))
        .and(path("/wc/v3/orders"))
        .respond_with(ResponseTemplate::new(502).set_body_string("upstream timeout"))
        .expect(1)
        .mount(&app.commerce)
        .await;

    let response = app.post_form("/checkout", &checkout_form("gateway")).await;
    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("notice--error"));

    let requests = app.commerce.received_requests().await.unwrap();
    let create = requests
        .iter()
        .find(|r| r.method.as_str() == "POST" && r.url.path() == "/wc/v3/orders")
        .unwrap();
    let key = create
        .headers
        .get(IDEMPOTENCY_HEADER)
        .unwrap()
        .to_str()
        .unwrap()
        .to_owned();
    let sent: serde_json::Value = serde_json::from_slice(&create.body).unwrap();
    assert!(
        sent["meta_data"]
            .as_array()
            .unwrap()
            .iter()
            .any(|m| m["value"] == key.as_str())
    );

    // The failed request did reach the store and created the order.
    Mock::given(method("GET"))
        .and(path("/wc/v3/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([order_json(
            1042, "300000", "novino", &key
        )])))
        .expect(1)
        .mount(&app.commerce)
        .await;

    let response = app.post_form("/checkout", &checkout_form("gateway")).await;
    assert_eq!(location(&response), "/checkout/payment");
    assert!(app.page("/checkout/payment").await.contains("#1042"));
}

#[tokio::test]
async fn test_disconnect_during_submission_creates_one_order() {
    let app = TestApp::spawn().await;
    fill_cart(&app).await;
    Mock::given(method("POST"))
        .and(path("/wc/v3/orders"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(order_json(1042, "300000", "novino", ""))
                .set_delay(Duration::from_millis(800)),
        )
        .mount(&app.commerce)
        .await;

    post_and_disconnect(&app, "/checkout", &checkout_form("gateway")).await;
    // The submission carries on without the browser.
    tokio::time::sleep(Duration::from_millis(1500)).await;

    let response = app.post_form("/checkout", &checkout_form("gateway")).await;
    assert_eq!(location(&response), "/checkout/payment");
    assert!(app.page("/checkout/payment").await.contains("#1042"));

    let requests = app.commerce.received_requests().await.unwrap();
    assert_eq!(order_creations(&requests), 1);
}

#[tokio::test]
async fn test_resubmission_after_disconnect_reuses_key_and_looks_up() {
    let app = TestApp::spawn().await;
    fill_cart(&app).await;
    // Never answers in time: every submission is abandoned by the client.
    Mock::given(method("POST"))
        .and(path("/wc/v3/orders"))
        .respond_with(ResponseTemplate::new(504).set_delay(Duration::from_millis(400)))
        .mount(&app.commerce)
        .await;
    Mock::given(method("GET"))
        .and(path("/wc/v3/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&app.commerce)
        .await;

    post_and_disconnect(&app, "/checkout", &checkout_form("gateway")).await;
    let response = app.post_form("/checkout", &checkout_form("gateway")).await;
    assert_eq!(response.status(), 200);

    let requests = app.commerce.received_requests().await.unwrap();
    let keys: Vec<_> = requests
        .iter()
        .filter(|r| r.method.as_str() == "POST" && r.url.path() == "/wc/v3/orders")
        .map(|r| r.headers.get(IDEMPOTENCY_HEADER).unwrap().to_str().unwrap().to_owned())
        .collect();
    assert_eq!(keys.len(), 2);
    assert_eq!(keys[0], keys[1]);
    assert!(
        requests
            .iter()
            .any(|r| r.method.as_str() == "GET" && r.url.path() == "/wc/v3/orders")
    );
}

#[tokio::test]
async fn test_disconnect_during_payment_still_confirms() {
    let app = TestApp::spawn().await;
    fill_cart(&app).await;
    mount_order_updates(&app).await;
    Mock::given(method("POST"))
        .and(path("/wc/v3/orders"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(order_json(1042, "300000", "novino", "")),
        )
        .expect(1)
        .mount(&app.commerce)
        .await;
    Mock::given(method("POST"))
        .and(path("/gateway/payments"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "success": true, "reference": "REF-9" }))
                .set_delay(Duration::from_millis(800)),
        )
        .mount(&app.gateway)
        .await;

    let response = app.post_form("/checkout", &checkout_form("gateway")).await;
    assert_eq!(location(&response), "/checkout/payment");

    post_and_disconnect(&app, "/checkout/payment", &[("pay", "1".to_owned())]).await;
    tokio::time::sleep(Duration::from_millis(1500)).await;

    let body = app.page("/checkout/confirmation").await;
    assert!(body.contains("#1042"));
    assert!(body.contains("REF-9"));
    assert!(app.page("/cart/count").await.contains("hidden"));

    // Paying again has nothing left to charge.
    let response = app.post_form("/checkout/payment", &[("pay", "1")]).await;
    assert_eq!(location(&response), "/checkout");
    let requests = app.gateway.received_requests().await.unwrap();
    assert_eq!(payment_requests(&requests).len(), 1);
}

#[tokio::test]
async fn test_abandon_keeps_cart_and_order() {
    let app = TestApp::spawn().await;
    fill_cart(&app).await;
    Mock::given(method("POST"))
        .and(path("/wc/v3/orders"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(order_json(1042, "300000", "novino", "")),
        )
        .expect(1)
        .mount(&app.commerce)
        .await;

    app.post_form("/checkout", &checkout_form("gateway")).await;
    let response = app.post_form("/checkout/abandon", &[("back", "1")]).await;
    assert_eq!(location(&response), "/cart");

    let body = app.page("/cart").await;
    assert!(body.contains("Your order is saved."));
    assert!(body.contains("Brake pad set"));

    let response = app.get("/checkout").await;
    assert_eq!(location(&response), "/checkout/payment");
}

#[tokio::test]
async fn test_confirmation_without_order_redirects_home() {
    let app = TestApp::spawn().await;

    let response = app.get("/checkout/confirmation").await;
    assert_eq!(response.status(), 303);
    assert_eq!(location(&response), "/");
}
