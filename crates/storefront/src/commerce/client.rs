//! Commerce API client implementation.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;
use uuid::Uuid;

use autoparts_core::{CategoryId, CustomerId, ListingQuery, OrderId, ProductId};

use crate::config::CommerceConfig;
use crate::http::{self, Page};

use super::CommerceError;
use super::cache::{CacheKey, CacheValue};
use super::types::{
    Category, Customer, NewCustomer, NewOrder, Order, OrderUpdate, Product, build_hierarchy,
};

/// Header the commerce API uses to de-duplicate order creation.
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Products and posts change rarely; cache them for an hour.
const CATALOG_TTL: Duration = Duration::from_secs(3600);

/// Categories change even less; cache them for a day.
const TAXONOMY_TTL: Duration = Duration::from_secs(86_400);

/// Page size used when fetching every category at once.
const CATEGORY_PAGE_SIZE: u32 = 100;

/// How many recent orders to scan when looking one up by checkout key.
const ORDER_LOOKUP_PAGE_SIZE: u32 = 20;

// =============================================================================
// CommerceClient
// =============================================================================

/// Client for the commerce REST API.
///
/// Cloning is cheap; clones share the HTTP connection pool and caches.
#[derive(Clone)]
pub struct CommerceClient {
    inner: Arc<CommerceClientInner>,
}

struct CommerceClientInner {
    client: reqwest::Client,
    base_url: Url,
    consumer_key: SecretString,
    consumer_secret: SecretString,
    catalog: Cache<CacheKey, CacheValue>,
    taxonomy: Cache<CacheKey, CacheValue>,
}

impl CommerceClient {
    /// Create a new commerce API client.
    #[must_use]
    pub fn new(config: &CommerceConfig, client: reqwest::Client) -> Self {
        let catalog = Cache::builder()
            .max_capacity(1000)
            .time_to_live(CATALOG_TTL)
            .build();
        let taxonomy = Cache::builder()
            .max_capacity(100)
            .time_to_live(TAXONOMY_TTL)
            .build();

        Self {
            inner: Arc::new(CommerceClientInner {
                client,
                base_url: config.api_url.clone(),
                consumer_key: config.consumer_key.clone(),
                consumer_secret: config.consumer_secret.clone(),
                catalog,
                taxonomy,
            }),
        }
    }

    /// Build an endpoint URL with query parameters and the API credentials.
    fn url(&self, path: &str, params: &[(&str, String)]) -> Result<Url, CommerceError> {
        let mut url = self.inner.base_url.join(path)?;
        url.query_pairs_mut()
            .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())))
            .append_pair("consumer_key", self.inner.consumer_key.expose_secret())
            .append_pair("consumer_secret", self.inner.consumer_secret.expose_secret());
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        self.inner.client.request(method, url)
    }

    /// Send a request and return the response headers and body.
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<(HeaderMap, String), CommerceError> {
        // Errors carry the URL, and the URL carries the credentials.
        let response = request.send().await.map_err(reqwest::Error::without_url)?;
        let status = response.status();
        let headers = response.headers().clone();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(CommerceError::RateLimited(http::retry_after(&headers)));
        }

        let body = response.text().await.map_err(reqwest::Error::without_url)?;

        if status == StatusCode::NOT_FOUND {
            return Err(CommerceError::NotFound(what.to_owned()));
        }

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %http::truncate_body(&body),
                "Commerce API returned non-success status"
            );
            return Err(CommerceError::Api {
                status: status.as_u16(),
                message: http::error_message(&body),
            });
        }

        Ok((headers, body))
    }

    fn parse<T: DeserializeOwned>(body: &str) -> Result<T, CommerceError> {
        serde_json::from_str(body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %http::truncate_body(body),
                "Failed to parse commerce API response"
            );
            CommerceError::Parse(e)
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
        what: &str,
    ) -> Result<(T, HeaderMap), CommerceError> {
        let url = self.url(path, params)?;
        let (headers, body) = self.send(self.request(Method::GET, url), what).await?;
        Ok((Self::parse(&body)?, headers))
    }

    async fn send_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        idempotency_key: Option<Uuid>,
        what: &str,
    ) -> Result<T, CommerceError> {
        let url = self.url(path, &[])?;
        let mut request = self.request(method, url).json(body);
        if let Some(key) = idempotency_key {
            request = request.header(IDEMPOTENCY_HEADER, key.to_string());
        }
        let (_, body) = self.send(request, what).await?;
        Self::parse(&body)
    }

    // =========================================================================
    // Product Methods
    // =========================================================================

    /// Get one page of products for a listing query.
    ///
    /// Only the primary category is forwarded; the API filters on a single
    /// category. Results are cached unless the query is a search.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn products(&self, query: &ListingQuery) -> Result<Page<Product>, CommerceError> {
        let params = product_params(query);
        let cache_key = CacheKey::Products(encode_params(&params));
        let cacheable = query.search.is_none();

        if cacheable
            && let Some(CacheValue::Products(page)) = self.inner.catalog.get(&cache_key).await
        {
            debug!("Cache hit for products");
            return Ok(page);
        }

        let (items, headers) = self.get::<Vec<Product>>("products", &params, "products").await?;
        let page = Page::from_headers(items, &headers);

        if cacheable {
            self.inner
                .catalog
                .insert(cache_key, CacheValue::Products(page.clone()))
                .await;
        }

        Ok(page)
    }

    /// Get featured products for the home page.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn featured_products(&self, limit: u32) -> Result<Vec<Product>, CommerceError> {
        let cache_key = CacheKey::Featured(limit);
        if let Some(CacheValue::ProductList(products)) = self.inner.catalog.get(&cache_key).await {
            debug!("Cache hit for featured products");
            return Ok(products);
        }

        let params = [
            ("featured", "true".to_owned()),
            ("per_page", limit.to_string()),
        ];
        let (products, _) = self
            .get::<Vec<Product>>("products", &params, "featured products")
            .await?;

        self.inner
            .catalog
            .insert(cache_key, CacheValue::ProductList(products.clone()))
            .await;
        Ok(products)
    }

    /// Get several products by ID (used for related products).
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, CommerceError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let cache_key = CacheKey::Related(ids.to_vec());
        if let Some(CacheValue::ProductList(products)) = self.inner.catalog.get(&cache_key).await {
            debug!("Cache hit for related products");
            return Ok(products);
        }

        let include = ids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let params = [
            ("include", include),
            ("per_page", ids.len().to_string()),
        ];
        let (products, _) = self
            .get::<Vec<Product>>("products", &params, "related products")
            .await?;

        self.inner
            .catalog
            .insert(cache_key, CacheValue::ProductList(products.clone()))
            .await;
        Ok(products)
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns [`CommerceError::NotFound`] for unknown products, or another
    /// error if the API request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product(&self, id: ProductId) -> Result<Product, CommerceError> {
        let cache_key = CacheKey::Product(id);
        if let Some(CacheValue::Product(product)) = self.inner.catalog.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let (product, _) = self
            .get::<Product>(&format!("products/{id}"), &[], &format!("product {id}"))
            .await?;

        self.inner
            .catalog
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;
        Ok(product)
    }

    // =========================================================================
    // Category Methods
    // =========================================================================

    /// Get all categories as a two-level tree.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<Category>, CommerceError> {
        if let Some(CacheValue::Categories(categories)) =
            self.inner.taxonomy.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let params = [("per_page", CATEGORY_PAGE_SIZE.to_string())];
        let (flat, _) = self
            .get::<Vec<Category>>("products/categories", &params, "categories")
            .await?;
        let tree = build_hierarchy(flat);

        self.inner
            .taxonomy
            .insert(CacheKey::Categories, CacheValue::Categories(tree.clone()))
            .await;
        Ok(tree)
    }

    /// Get a category by ID.
    ///
    /// # Errors
    ///
    /// Returns [`CommerceError::NotFound`] for unknown categories, or another
    /// error if the API request fails.
    #[instrument(skip(self), fields(category_id = %id))]
    pub async fn category(&self, id: CategoryId) -> Result<Category, CommerceError> {
        let cache_key = CacheKey::Category(id);
        if let Some(CacheValue::Category(category)) = self.inner.taxonomy.get(&cache_key).await {
            debug!("Cache hit for category");
            return Ok(*category);
        }

        let (category, _) = self
            .get::<Category>(
                &format!("products/categories/{id}"),
                &[],
                &format!("category {id}"),
            )
            .await?;

        self.inner
            .taxonomy
            .insert(cache_key, CacheValue::Category(Box::new(category.clone())))
            .await;
        Ok(category)
    }

    // =========================================================================
    // Order Methods
    // =========================================================================

    /// Create an order.
    ///
    /// The idempotency key is sent as a header and is also stored in the
    /// order's metadata by the caller.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, order), fields(checkout_key = %idempotency_key))]
    pub async fn create_order(
        &self,
        order: &NewOrder,
        idempotency_key: Uuid,
    ) -> Result<Order, CommerceError> {
        let created: Order = self
            .send_json(
                Method::POST,
                "orders",
                order,
                Some(idempotency_key),
                "orders",
            )
            .await?;
        tracing::info!(order_id = %created.id, "Order created");
        Ok(created)
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns [`CommerceError::NotFound`] for unknown orders, or another
    /// error if the API request fails.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn order(&self, id: OrderId) -> Result<Order, CommerceError> {
        let (order, _) = self
            .get::<Order>(&format!("orders/{id}"), &[], &format!("order {id}"))
            .await?;
        Ok(order)
    }

    /// Update an order's status or payment fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, update), fields(order_id = %id))]
    pub async fn update_order(
        &self,
        id: OrderId,
        update: &OrderUpdate,
    ) -> Result<Order, CommerceError> {
        self.send_json(
            Method::PUT,
            &format!("orders/{id}"),
            update,
            None,
            &format!("order {id}"),
        )
        .await
    }

    /// Recent orders whose billing details match `email`, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, email))]
    pub async fn orders_for_email(&self, email: &str) -> Result<Vec<Order>, CommerceError> {
        let params = [
            ("search", email.to_owned()),
            ("per_page", ORDER_LOOKUP_PAGE_SIZE.to_string()),
            ("orderby", "date".to_owned()),
            ("order", "desc".to_owned()),
        ];
        let (orders, _) = self.get::<Vec<Order>>("orders", &params, "orders").await?;
        Ok(orders)
    }

    /// A customer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(customer_id = %customer_id))]
    pub async fn orders_for_customer(
        &self,
        customer_id: CustomerId,
        page: u32,
    ) -> Result<Page<Order>, CommerceError> {
        let params = [
            ("customer", customer_id.to_string()),
            ("page", page.max(1).to_string()),
            ("per_page", "10".to_owned()),
            ("orderby", "date".to_owned()),
            ("order", "desc".to_owned()),
        ];
        let (orders, headers) = self.get::<Vec<Order>>("orders", &params, "orders").await?;
        Ok(Page::from_headers(orders, &headers))
    }

    // =========================================================================
    // Customer Methods
    // =========================================================================

    /// Register a customer account.
    ///
    /// # Errors
    ///
    /// Returns [`CommerceError::Api`] when the API rejects the registration
    /// (for example, an email that is already registered).
    #[instrument(skip(self, customer))]
    pub async fn create_customer(&self, customer: &NewCustomer) -> Result<Customer, CommerceError> {
        let created: Customer = self
            .send_json(Method::POST, "customers", customer, None, "customers")
            .await?;
        tracing::info!(customer_id = %created.id, "Customer registered");
        Ok(created)
    }

    /// Find a customer by email.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, email))]
    pub async fn customer_by_email(&self, email: &str) -> Result<Option<Customer>, CommerceError> {
        let params = [("email", email.to_owned())];
        let (customers, _) = self
            .get::<Vec<Customer>>("customers", &params, "customers")
            .await?;
        Ok(customers.into_iter().next())
    }

    /// Check that the API is reachable and the credentials work.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn ping(&self) -> Result<(), CommerceError> {
        let params = [("per_page", "1".to_owned())];
        self.get::<Vec<serde_json::Value>>("products", &params, "products")
            .await?;
        Ok(())
    }
}

/// API parameters for a product listing query.
fn product_params(query: &ListingQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("page", query.page.to_string()),
        ("per_page", query.per_page.to_string()),
    ];
    if let Some(category) = query.primary_category() {
        params.push(("category", category.to_string()));
    }
    if let Some(search) = &query.search {
        params.push(("search", search.clone()));
    }
    if let Some(orderby) = query.orderby {
        params.push(("orderby", orderby.as_str().to_owned()));
    }
    if let Some(order) = query.order {
        params.push(("order", order.as_str().to_owned()));
    }
    if let Some(min) = query.min_price {
        params.push(("min_price", min.to_string()));
    }
    if let Some(max) = query.max_price {
        params.push(("max_price", max.to_string()));
    }
    params
}

fn encode_params(params: &[(&str, String)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())))
        .finish()
}
