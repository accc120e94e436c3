//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers (CSP with the request's nonce, HSTS-free defaults)
//! 5. CSP nonce (generate per-request nonce for inline scripts)
//! 6. Session layer (tower-sessions)
//! 7. Rate limiting on auth and checkout posts (governor)

pub mod auth;
pub mod csp;
pub mod page_context;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{OptionalAuth, RequireAuth, clear_current_customer, set_current_customer};
pub use csp::{CspNonce, csp_nonce_middleware};
pub use page_context::PageContext;
pub use rate_limit::{auth_rate_limiter, checkout_rate_limiter};
pub use request_id::{RequestId, request_id_middleware};
pub use security_headers::security_headers_middleware;
pub use session::{create_session_layer, postgres_store};
