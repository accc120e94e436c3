//! End-to-end test harness for the Autoparts storefront.
//!
//! [`TestApp::spawn`] serves the real router on an ephemeral port with every
//! remote dependency replaced by a `wiremock` server:
//!
//! - `commerce` answers `wc/v3` catalog and order calls
//! - `content` answers `wp/v2` post calls and JWT token requests
//! - `gateway` answers `POST /payments`
//!
//! Sessions live in an in-memory store and the database pool connects
//! lazily, so no `PostgreSQL` instance is needed. The HTTP client keeps
//! cookies and does not follow redirects, so tests can assert on each hop.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p autoparts-integration-tests
//! ```

#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use reqwest::Client;
use secrecy::SecretString;
use serde::Serialize;
use serde_json::{Value, json};
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_sessions::MemoryStore;
use url::Url;
use wiremock::MockServer;

use autoparts_core::CurrencyCode;
use autoparts_storefront::config::{CommerceConfig, PaymentConfig, StorefrontConfig};
use autoparts_storefront::middleware::create_session_layer;
use autoparts_storefront::state::AppState;

/// Consumer key every commerce request must carry.
pub const CONSUMER_KEY: &str = "ck_integration";

/// A running storefront and its mocked backends.
pub struct TestApp {
    pub address: SocketAddr,
    pub client: Client,
    pub commerce: MockServer,
    pub content: MockServer,
    pub gateway: MockServer,
}

fn base(server: &MockServer, path: &str) -> Url {
    Url::parse(&format!("{}/{path}/", server.uri())).unwrap()
}

impl TestApp {
    /// Start the storefront with fresh mock servers.
    pub async fn spawn() -> Self {
        let commerce = MockServer::start().await;
        let content = MockServer::start().await;
        let gateway = MockServer::start().await;

        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let address = listener.local_addr().unwrap();

        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://storefront@127.0.0.1:1/unused"),
            host: address.ip(),
            port: address.port(),
            base_url: format!("http://{address}"),
            currency: CurrencyCode::IRR,
            http_timeout: Duration::from_secs(5),
            commerce: CommerceConfig {
                api_url: base(&commerce, "wc/v3"),
                consumer_key: SecretString::from(CONSUMER_KEY),
                consumer_secret: SecretString::from("cs_integration"),
            },
            blog_api_url: base(&content, "wp/v2"),
            auth_api_url: base(&content, "jwt-auth/v1"),
            payment: PaymentConfig {
                gateway_url: Some(base(&gateway, "gateway")),
                api_key: None,
            },
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 0.0,
            sentry_traces_sample_rate: 0.0,
            log_json: false,
        };

        // Never connected: only the readiness probe would touch it.
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://storefront@127.0.0.1:1/unused")
            .unwrap();

        let session_layer = create_session_layer(MemoryStore::default(), &config);
        let state = AppState::new(config, pool).unwrap();
        let app = autoparts_storefront::app(state, session_layer);

        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });

        let client = Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();

        Self {
            address,
            client,
            commerce,
            content,
            gateway,
        }
    }

    /// Absolute URL for a storefront path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.address)
    }

    /// GET a storefront path.
    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    /// POST a form to a storefront path.
    pub async fn post_form<T: Serialize + ?Sized>(&self, path: &str, form: &T) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .unwrap()
    }

    /// GET a path and return its body, asserting a 200.
    pub async fn page(&self, path: &str) -> String {
        let response = self.get(path).await;
        assert_eq!(response.status(), 200, "GET {path}");
        response.text().await.unwrap()
    }
}

/// The `Location` header of a redirect.
#[must_use]
pub fn location(response: &reqwest::Response) -> &str {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// A commerce API product.
#[must_use]
pub fn product_json(id: u64, name: &str, price: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "slug": format!("part-{id}"),
        "sku": format!("SKU-{id}"),
        "price": price,
        "regular_price": price,
        "sale_price": "",
        "on_sale": false,
        "stock_status": "instock",
        "description": "<p>Fits most models.</p>",
        "short_description": "",
        "categories": [{ "id": 15, "name": "Brakes", "slug": "brakes" }],
        "images": [],
        "tags": [],
        "related_ids": []
    })
}

/// A commerce API order carrying `checkout_key` in its metadata.
#[must_use]
pub fn order_json(id: u64, total: &str, payment_method: &str, checkout_key: &str) -> Value {
    json!({
        "id": id,
        "number": id.to_string(),
        "status": "pending",
        "currency": "IRR",
        "total": total,
        "customer_id": 0,
        "payment_method": payment_method,
        "billing": { "email": "sara@example.com" },
        "line_items": [],
        "meta_data": [{ "key": "_checkout_key", "value": checkout_key }]
    })
}

/// A checkout form that passes validation.
#[must_use]
pub fn checkout_form(payment_method: &str) -> Vec<(&'static str, String)> {
    vec![
        ("first_name", "Sara".to_owned()),
        ("last_name", "Ahmadi".to_owned()),
        ("address_1", "12 Valiasr Street".to_owned()),
        ("address_2", String::new()),
        ("city", "Tehran".to_owned()),
        ("state", "Tehran".to_owned()),
        ("postcode", "1234567890".to_owned()),
        ("country", "IR".to_owned()),
        ("email", "sara@example.com".to_owned()),
        ("phone", "09123456789".to_owned()),
        ("payment_method", payment_method.to_owned()),
        ("order_notes", String::new()),
    ]
}
