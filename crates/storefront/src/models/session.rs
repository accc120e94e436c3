//! Session-related types.
//!
//! Everything the storefront remembers about a visitor lives in the
//! tower-sessions record: the cart, the current checkout attempt, the last
//! confirmed order, the signed-in customer and a one-shot notice.

use serde::{Deserialize, Serialize};

use autoparts_core::{CustomerId, PlacedOrder};

/// Session-stored customer identity.
///
/// Minimal data stored in the session to identify the signed-in customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentCustomer {
    /// Email the auth API reported for the account.
    pub email: String,
    /// Name shown in the header.
    pub display_name: String,
    /// Commerce customer ID, when the account has one.
    pub customer_id: Option<CustomerId>,
}

impl CurrentCustomer {
    /// Name to greet the customer with.
    #[must_use]
    pub fn greeting_name(&self) -> &str {
        if self.display_name.is_empty() {
            &self.email
        } else {
            &self.display_name
        }
    }
}

/// Severity of a flash notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

impl NoticeLevel {
    /// CSS modifier class.
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Success => "notice--success",
            Self::Info => "notice--info",
            Self::Error => "notice--error",
        }
    }
}

/// A message shown once on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// The order shown on the confirmation page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmedOrder {
    pub order: PlacedOrder,
    /// Gateway reference, for paid orders.
    pub reference: Option<String>,
}

/// Session keys.
pub mod keys {
    /// The visitor's cart.
    pub const CART: &str = "cart";

    /// The current checkout attempt.
    pub const CHECKOUT: &str = "checkout";

    /// The order shown on the confirmation page.
    pub const LAST_ORDER: &str = "last_order";

    /// The signed-in customer.
    pub const CURRENT_CUSTOMER: &str = "current_customer";

    /// One-shot notice for the next page.
    pub const NOTICE: &str = "notice";
}
