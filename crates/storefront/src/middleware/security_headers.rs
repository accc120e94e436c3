//! Security headers middleware for XSS, clickjacking, and isolation protection.
//!
//! Adds restrictive security headers to all responses. Product and post
//! images are hot-linked from the commerce host, which is the only
//! third-party origin the policy allows.

use axum::{
    extract::{Request, State},
    http::{
        HeaderName, HeaderValue,
        header::{
            CACHE_CONTROL, CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS,
            X_FRAME_OPTIONS,
        },
    },
    middleware::Next,
    response::Response,
};
use url::Url;

use super::csp::CspNonce;
use crate::state::AppState;

/// Build the Content-Security-Policy for a response.
///
/// ```text
/// default-src 'none';
/// script-src 'self' 'nonce-…';
/// style-src 'self';
/// img-src 'self' data: <commerce origin> <blog origin>;
/// form-action 'self';
/// frame-ancestors 'none';
/// ...
/// ```
#[must_use]
pub fn content_security_policy(nonce: Option<&str>, image_origins: &[String]) -> String {
    let script_src = nonce.filter(|n| !n.is_empty()).map_or_else(
        || "script-src 'self'".to_owned(),
        |n| format!("script-src 'self' 'nonce-{n}'"),
    );

    let mut img_src = vec!["'self'".to_owned(), "data:".to_owned()];
    for origin in image_origins {
        if !img_src.contains(origin) {
            img_src.push(origin.clone());
        }
    }

    [
        "default-src 'none'".to_owned(),
        script_src,
        "style-src 'self'".to_owned(),
        "font-src 'self'".to_owned(),
        format!("img-src {}", img_src.join(" ")),
        "connect-src 'self'".to_owned(),
        "frame-src 'none'".to_owned(),
        "object-src 'none'".to_owned(),
        "base-uri 'self'".to_owned(),
        "form-action 'self'".to_owned(),
        "frame-ancestors 'none'".to_owned(),
    ]
    .join("; ")
}

/// The `scheme://host[:port]` part of a URL.
fn origin(url: &Url) -> String {
    url.origin().ascii_serialization()
}

/// Add security headers to all responses.
///
/// Headers applied:
/// - `X-Frame-Options: DENY` - Prevent clickjacking
/// - `X-Content-Type-Options: nosniff` - Prevent MIME sniffing
/// - `Referrer-Policy: same-origin` - No referrer leakage to other sites
/// - `Content-Security-Policy` - Strict CSP with the request's script nonce
/// - `Permissions-Policy` - Deny sensitive features (payment stays off; the
///   gateway is server-to-server)
/// - `Cache-Control: no-store` - Pages carry cart and account data
/// - `Cross-Origin-Opener-Policy: same-origin` - Process isolation
pub async fn security_headers_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let nonce = request.extensions().get::<CspNonce>().cloned();
    let mut response = next.run(request).await;

    let config = state.config();
    let image_origins = [
        origin(&config.commerce.api_url),
        origin(&config.blog_api_url),
    ];
    let csp = content_security_policy(nonce.as_ref().map(CspNonce::value), &image_origins);

    let headers = response.headers_mut();
    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(REFERRER_POLICY, HeaderValue::from_static("same-origin"));

    match HeaderValue::from_str(&csp) {
        Ok(value) => {
            headers.insert(CONTENT_SECURITY_POLICY, value);
        }
        Err(e) => tracing::error!(error = %e, "Invalid CSP header value"),
    }

    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static(
            "camera=(), \
             geolocation=(), \
             gyroscope=(), \
             magnetometer=(), \
             microphone=(), \
             payment=(), \
             usb=()",
        ),
    );

    // Static files set their own caching.
    if !headers.contains_key(CACHE_CONTROL) {
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store, max-age=0"));
    }

    headers.insert(
        HeaderName::from_static("cross-origin-opener-policy"),
        HeaderValue::from_static("same-origin"),
    );

    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_csp_includes_nonce_and_image_origins() {
        let csp = content_security_policy(
            Some("abc123"),
            &[
                "https://renault-store.ir".to_owned(),
                "https://renault-store.ir".to_owned(),
            ],
        );
        assert!(csp.contains("script-src 'self' 'nonce-abc123'"));
        assert!(csp.contains("img-src 'self' data: https://renault-store.ir;"));
        assert!(csp.starts_with("default-src 'none'"));
    }

    #[test]
    fn test_csp_without_nonce() {
        let csp = content_security_policy(None, &[]);
        assert!(csp.contains("script-src 'self';"));
        assert!(!csp.contains("nonce-"));
    }

    #[test]
    fn test_origin_strips_path() {
        let url = Url::parse("https://shop.test:8443/wp-json/wc/v3/").unwrap();
        assert_eq!(origin(&url), "https://shop.test:8443");
    }
}
