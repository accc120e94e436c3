//! Shared plumbing for the REST API clients.
//!
//! The commerce, content and auth backends are all WordPress REST endpoints,
//! so they agree on pagination headers and the shape of error bodies.

use std::time::Duration;

use reqwest::header::HeaderMap;
use serde::Deserialize;

/// Header carrying the number of result pages for a collection request.
pub const TOTAL_PAGES_HEADER: &str = "x-wp-totalpages";

/// Header carrying the number of results for a collection request.
pub const TOTAL_HEADER: &str = "x-wp-total";

/// Maximum number of body characters written to logs.
const LOG_BODY_CHARS: usize = 500;

/// One page of a paginated collection.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Number of pages reported by the server (0 when there are no results).
    pub total_pages: u32,
    /// Number of results reported by the server.
    pub total: u32,
}

impl<T> Page<T> {
    /// An empty result, used when a listing call fails.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            items: Vec::new(),
            total_pages: 0,
            total: 0,
        }
    }

    /// Build a page from a response's items and pagination headers.
    ///
    /// Servers that omit the headers get one page if there are any items.
    #[must_use]
    pub fn from_headers(items: Vec<T>, headers: &HeaderMap) -> Self {
        let fallback = u32::from(!items.is_empty());
        let total_pages = header_u32(headers, TOTAL_PAGES_HEADER).unwrap_or(fallback);
        let total = header_u32(headers, TOTAL_HEADER)
            .unwrap_or_else(|| u32::try_from(items.len()).unwrap_or(u32::MAX));
        Self {
            items,
            total_pages,
            total,
        }
    }
}

/// Build the `reqwest` client shared by every API client.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialised.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .user_agent(concat!("autoparts-storefront/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Parse a numeric header.
#[must_use]
pub fn header_u32(headers: &HeaderMap, name: &str) -> Option<u32> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u32>().ok())
}

/// Seconds to wait from a `Retry-After` header, defaulting to 1.
#[must_use]
pub fn retry_after(headers: &HeaderMap) -> u64 {
    headers
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(1)
}

/// Truncate a response body for logging.
#[must_use]
pub fn truncate_body(body: &str) -> String {
    body.chars().take(LOG_BODY_CHARS).collect()
}

/// WordPress REST error body: `{"code": "...", "message": "...", "data": {...}}`.
#[derive(Debug, Deserialize)]
struct WpErrorBody {
    #[serde(default)]
    code: String,
    message: String,
}

/// Human-readable message from an error response body.
///
/// Uses the `message` of a WordPress error object when the body is one,
/// otherwise a truncated copy of the body. Markup in messages is stripped.
#[must_use]
pub fn error_message(body: &str) -> String {
    match serde_json::from_str::<WpErrorBody>(body) {
        Ok(err) if !err.message.is_empty() => crate::html::strip_tags(&err.message),
        Ok(err) => err.code,
        Err(_) => body.chars().take(200).collect(),
    }
}

/// WordPress error `code` from an error response body, if present.
#[must_use]
pub fn error_code(body: &str) -> Option<String> {
    serde_json::from_str::<WpErrorBody>(body)
        .ok()
        .map(|err| err.code)
        .filter(|code| !code.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use reqwest::header::HeaderValue;

    use super::*;

    #[test]
    fn test_page_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(TOTAL_PAGES_HEADER, HeaderValue::from_static("7"));
        headers.insert(TOTAL_HEADER, HeaderValue::from_static("80"));
        let page = Page::from_headers(vec![1, 2, 3], &headers);
        assert_eq!(page.total_pages, 7);
        assert_eq!(page.total, 80);
    }

    #[test]
    fn test_page_without_headers() {
        let page = Page::from_headers(vec!["a"], &HeaderMap::new());
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.total, 1);

        let page: Page<u8> = Page::from_headers(Vec::new(), &HeaderMap::new());
        assert_eq!(page.total_pages, 0);
    }

    #[test]
    fn test_error_message_from_wordpress_body() {
        let body = r#"{"code":"woocommerce_rest_invalid_id","message":"Invalid <b>ID</b>.","data":{"status":404}}"#;
        assert_eq!(error_message(body), "Invalid ID.");
        assert_eq!(error_code(body).as_deref(), Some("woocommerce_rest_invalid_id"));
    }

    #[test]
    fn test_error_message_from_plain_body() {
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
        assert_eq!(error_code("Bad Gateway"), None);
    }

    #[test]
    fn test_retry_after_default() {
        assert_eq!(retry_after(&HeaderMap::new()), 1);
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("30"));
        assert_eq!(retry_after(&headers), 30);
    }
}
