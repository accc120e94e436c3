//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use autoparts_core::{CurrencyCode, DiscountPolicy, NoDiscounts};

use crate::blog::BlogClient;
use crate::commerce::CommerceClient;
use crate::config::StorefrontConfig;
use crate::http;
use crate::services::{
    AuthClient, AuthError, CheckoutService, HttpPaymentGateway, PaymentError, PaymentGateway,
    SimulatedGateway,
};

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("auth client error: {0}")]
    Auth(#[from] AuthError),
    #[error("payment gateway error: {0}")]
    Payment(#[from] PaymentError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the API clients, the session database pool and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    commerce: CommerceClient,
    blog: BlogClient,
    auth: AuthClient,
    gateway: Arc<dyn PaymentGateway>,
    discounts: Arc<dyn DiscountPolicy>,
}

impl AppState {
    /// Create the application state.
    ///
    /// Payments go to the configured gateway, or to the simulated gateway
    /// when no gateway URL is set.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, StateError> {
        let gateway: Arc<dyn PaymentGateway> = match &config.payment.gateway_url {
            Some(url) => Arc::new(HttpPaymentGateway::new(
                url,
                config.payment.api_key.as_ref(),
                config.http_timeout,
            )?),
            None => {
                tracing::warn!("PAYMENT_GATEWAY_URL not set, using the simulated payment gateway");
                Arc::new(SimulatedGateway)
            }
        };
        Self::with_gateway(config, pool, gateway)
    }

    /// Create the application state with a specific payment gateway.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    pub fn with_gateway(
        config: StorefrontConfig,
        pool: PgPool,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Result<Self, StateError> {
        let client = http::build_client(config.http_timeout)?;
        let commerce = CommerceClient::new(&config.commerce, client.clone());
        let blog = BlogClient::new(config.blog_api_url.clone(), client.clone());
        let auth = AuthClient::new(&config.auth_api_url, client)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                commerce,
                blog,
                auth,
                gateway,
                discounts: Arc::new(NoDiscounts),
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Session database pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn commerce(&self) -> &CommerceClient {
        &self.inner.commerce
    }

    #[must_use]
    pub fn blog(&self) -> &BlogClient {
        &self.inner.blog
    }

    #[must_use]
    pub fn auth(&self) -> &AuthClient {
        &self.inner.auth
    }

    /// Coupon policy applied on the cart page.
    #[must_use]
    pub fn discounts(&self) -> &dyn DiscountPolicy {
        self.inner.discounts.as_ref()
    }

    #[must_use]
    pub fn currency(&self) -> CurrencyCode {
        self.inner.config.currency
    }

    /// Checkout service wired to the commerce API and payment gateway.
    #[must_use]
    pub fn checkout(&self) -> CheckoutService<'_> {
        CheckoutService::new(
            &self.inner.commerce,
            self.inner.gateway.as_ref(),
            self.inner.config.currency,
        )
    }
}
