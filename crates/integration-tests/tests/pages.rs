//! Page rendering, error pages and cross-cutting middleware.

#![allow(clippy::unwrap_used)]

use autoparts_integration_tests::{TestApp, location, product_json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_health() {
    let app = TestApp::spawn().await;
    assert_eq!(app.page("/health").await, "ok");
}

#[tokio::test]
async fn test_home_renders_when_backends_fail() {
    let app = TestApp::spawn().await;

    let body = app.page("/").await;
    assert!(body.contains("Featured products are not available right now."));
}

#[tokio::test]
async fn test_unknown_path_renders_not_found_page() {
    let app = TestApp::spawn().await;

    let response = app.get("/no/such/page").await;
    assert_eq!(response.status(), 404);
    let body = response.text().await.unwrap();
    assert!(body.contains("error-status"));
}

#[tokio::test]
async fn test_security_headers_and_request_id() {
    let app = TestApp::spawn().await;

    let response = app.get("/contact").await;
    assert_eq!(response.status(), 200);
    let headers = response.headers().clone();
    let csp = headers
        .get("content-security-policy")
        .unwrap()
        .to_str()
        .unwrap()
        .to_owned();
    assert!(csp.contains("'nonce-"));
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert!(headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn test_product_page_renders_detail() {
    let app = TestApp::spawn().await;
    let mut product = product_json(101, "Brake pad set &amp; sensor", "150000");
    product["related_ids"] = serde_json::json!([]);
    Mock::given(method("GET"))
        .and(path("/wc/v3/products/101"))
        .respond_with(ResponseTemplate::new(200).set_body_json(product))
        .mount(&app.commerce)
        .await;

    let body = app.page("/product/101").await;
    assert!(body.contains("Brake pad set &amp; sensor"));
    assert!(!body.contains("&amp;amp;"));
    assert!(body.contains("SKU-101"));
    assert!(body.contains("<p>Fits most models.</p>"));
    assert!(body.contains("action=\"/cart/add\""));
}

#[tokio::test]
async fn test_missing_product_is_not_found() {
    let app = TestApp::spawn().await;
    Mock::given(method("GET"))
        .and(path("/wc/v3/products/404"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "code": "woocommerce_rest_product_invalid_id",
            "message": "Invalid ID."
        })))
        .mount(&app.commerce)
        .await;

    let response = app.get("/product/404").await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_blog_index_lists_posts() {
    let app = TestApp::spawn().await;
    Mock::given(method("GET"))
        .and(path("/wp/v2/posts"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-wp-totalpages", "1")
                .insert_header("x-wp-total", "1")
                .set_body_json(serde_json::json!([{
                    "id": 7,
                    "date": "2026-03-01T10:00:00",
                    "slug": "winter-tyres",
                    "title": { "rendered": "Choosing winter tyres" },
                    "excerpt": { "rendered": "<p>What to look for.</p>" },
                    "content": { "rendered": "<p>Long read.</p>" }
                }])),
        )
        .mount(&app.content)
        .await;

    let body = app.page("/blog").await;
    assert!(body.contains("Choosing winter tyres"));
    assert!(body.contains("href=\"/blog/7\""));
}

#[tokio::test]
async fn test_contact_validation_and_success() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form("/contact", &[("name", "S"), ("email", "nope"), ("message", "hi")])
        .await;
    assert_eq!(response.status(), 422);
    let body = response.text().await.unwrap();
    assert!(body.contains("field-error"));

    let response = app
        .post_form(
            "/contact",
            &[
                ("name", "Sara Ahmadi"),
                ("email", "sara@example.com"),
                ("phone", ""),
                ("subject", "Brake pads for L90"),
                ("message", "Which pads fit a 2012 L90?"),
            ],
        )
        .await;
    assert_eq!(response.status(), 303);
    assert_eq!(location(&response), "/contact");
    assert!(app.page("/contact").await.contains("notice--success"));
}

#[tokio::test]
async fn test_account_requires_sign_in() {
    let app = TestApp::spawn().await;

    let response = app.get("/account").await;
    assert_eq!(response.status(), 303);
    assert_eq!(location(&response), "/auth/login");
}
