//! Per-page layout data.
//!
//! Every full page renders the same header: cart badge, customer name, a
//! one-shot notice and the CSP nonce for inline scripts. [`PageContext`]
//! gathers those from the request so handlers only add their own data.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use autoparts_core::CurrencyCode;

use super::csp::CspNonce;
use crate::models::{CurrentCustomer, Notice, session_keys};
use crate::services::{cart, notice};
use crate::state::AppState;

/// Layout data shared by every full page.
#[derive(Debug, Clone)]
pub struct PageContext {
    pub nonce: String,
    pub cart_count: u32,
    pub customer_name: Option<String>,
    pub notice: Option<Notice>,
    pub currency: CurrencyCode,
}

impl PageContext {
    /// Whether a customer is signed in.
    #[must_use]
    pub const fn signed_in(&self) -> bool {
        self.customer_name.is_some()
    }
}

impl FromRequestParts<AppState> for PageContext {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let nonce = parts
            .extensions
            .get::<CspNonce>()
            .map(|n| n.value().to_owned())
            .unwrap_or_default();

        let (cart_count, customer_name, notice) = match parts.extensions.get::<Session>() {
            Some(session) => {
                let cart_count = cart::load(session).await.total_items();
                let customer_name = session
                    .get::<CurrentCustomer>(session_keys::CURRENT_CUSTOMER)
                    .await
                    .ok()
                    .flatten()
                    .map(|c| c.greeting_name().to_owned());
                (cart_count, customer_name, notice::take(session).await)
            }
            None => (0, None, None),
        };

        Ok(Self {
            nonce,
            cart_count,
            customer_name,
            notice,
            currency: state.currency(),
        })
    }
}
