//! Commerce REST API client (`wc/v3`).
//!
//! # Architecture
//!
//! - The commerce backend is the source of truth for catalog and orders;
//!   nothing is synced locally
//! - In-memory caching via `moka`: products for an hour, categories for a day
//! - Searches, orders and customers are never cached
//! - Requests carry the consumer key/secret as query parameters, so
//!   transport errors are logged without their URL
//!
//! # Example
//!
//! ```rust,ignore
//! use autoparts_storefront::commerce::CommerceClient;
//!
//! let client = CommerceClient::new(&config.commerce, http_client);
//! let page = client.products(&ListingQuery::new(ListingDefaults::PRODUCTS)).await?;
//! let product = client.product(ProductId::new(101)).await?;
//! ```

mod cache;
mod client;
pub mod types;

pub use client::{CommerceClient, IDEMPOTENCY_HEADER};
pub use types::*;

use thiserror::Error;

/// Errors that can occur when talking to the commerce API.
#[derive(Debug, Error)]
pub enum CommerceError {
    /// HTTP request failed (connection, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with an error status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the API.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// A request URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl CommerceError {
    /// Whether the request may succeed if simply sent again.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Api { status, .. } => *status >= 500,
            Self::RateLimited(_) => true,
            Self::Parse(_) | Self::NotFound(_) | Self::Url(_) => false,
        }
    }

    /// Message safe to show to customers.
    #[must_use]
    pub fn customer_message(&self) -> String {
        match self {
            Self::Api { status, message } if (400..500).contains(status) && !message.is_empty() => {
                message.clone()
            }
            Self::RateLimited(_) => {
                "The store is busy right now. Please try again in a moment.".to_owned()
            }
            _ => "We could not reach the store. Please try again.".to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_message_passes_client_errors_through() {
        let err = CommerceError::Api {
            status: 400,
            message: "Invalid billing email".into(),
        };
        assert_eq!(err.customer_message(), "Invalid billing email");
    }

    #[test]
    fn test_customer_message_hides_server_errors() {
        let err = CommerceError::Api {
            status: 500,
            message: "database exploded".into(),
        };
        assert!(!err.customer_message().contains("database"));
        assert!(err.is_transient());
    }

    #[test]
    fn test_not_found_is_not_transient() {
        assert!(!CommerceError::NotFound("order 9".into()).is_transient());
        assert!(CommerceError::RateLimited(3).is_transient());
    }
}
