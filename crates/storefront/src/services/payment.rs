//! Payment gateway seam.
//!
//! The checkout flow only sees [`PaymentGateway`]. Production talks to a
//! REST gateway (`POST {gateway}/payments`); when no gateway URL is
//! configured a [`SimulatedGateway`] approves every positive amount.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;
use url::Url;

use autoparts_core::{CurrencyCode, OrderId};

use crate::http;

/// Errors that can occur when talking to the payment gateway.
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("gateway error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("gateway configuration error: {0}")]
    Config(String),
}

/// A charge for one order.
///
/// Retrying a failed payment sends an identical request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentRequest {
    pub order_id: OrderId,
    pub amount: Decimal,
    pub currency: CurrencyCode,
}

/// What the gateway decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Approved { reference: Option<String> },
    Declined { message: String },
}

/// Takes payment for orders.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Charge the customer for an order.
    ///
    /// A decline is an `Ok` outcome; `Err` means the gateway could not be
    /// asked.
    async fn charge(&self, request: &PaymentRequest) -> Result<PaymentOutcome, PaymentError>;
}

/// Gateway response body.
#[derive(Debug, Deserialize)]
struct GatewayResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    reference: Option<String>,
}

impl From<GatewayResponse> for PaymentOutcome {
    fn from(response: GatewayResponse) -> Self {
        if response.success {
            Self::Approved {
                reference: response.reference,
            }
        } else {
            Self::Declined {
                message: response
                    .message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| "The payment was declined.".to_owned()),
            }
        }
    }
}

/// Payment gateway reached over HTTP.
#[derive(Clone)]
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    payments_url: Url,
}

impl HttpPaymentGateway {
    /// Create a gateway client.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is not a valid header value or the
    /// HTTP client fails to build.
    pub fn new(
        gateway_url: &Url,
        api_key: Option<&SecretString>,
        timeout: std::time::Duration,
    ) -> Result<Self, PaymentError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = api_key {
            let value = HeaderValue::from_str(&format!("Bearer {}", key.expose_secret()))
                .map_err(|e| PaymentError::Config(format!("Invalid API key format: {e}")))?;
            headers.insert("Authorization", value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        let payments_url = gateway_url
            .join("payments")
            .map_err(|e| PaymentError::Config(format!("Invalid gateway URL: {e}")))?;

        Ok(Self {
            client,
            payments_url,
        })
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    #[instrument(skip(self, request), fields(order_id = %request.order_id))]
    async fn charge(&self, request: &PaymentRequest) -> Result<PaymentOutcome, PaymentError> {
        let response = self
            .client
            .post(self.payments_url.clone())
            .json(request)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        let parsed = serde_json::from_str::<GatewayResponse>(&body);
        if status.is_success() {
            return Ok(parsed?.into());
        }

        // Declines may come back with a 4xx status and a normal body.
        if let Ok(response) = parsed
            && !response.success
        {
            return Ok(response.into());
        }

        tracing::error!(
            status = %status,
            body = %http::truncate_body(&body),
            "Payment gateway returned non-success status"
        );
        Err(PaymentError::Api {
            status: status.as_u16(),
            message: http::error_message(&body),
        })
    }
}

/// Stand-in gateway used when no gateway URL is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedGateway;

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn charge(&self, request: &PaymentRequest) -> Result<PaymentOutcome, PaymentError> {
        if request.amount <= Decimal::ZERO {
            return Ok(PaymentOutcome::Declined {
                message: "The order total must be greater than zero.".to_owned(),
            });
        }
        tracing::info!(order_id = %request.order_id, "Simulated payment approved");
        Ok(PaymentOutcome::Approved {
            reference: Some(format!("SIM-{}", request.order_id)),
        })
    }
}
