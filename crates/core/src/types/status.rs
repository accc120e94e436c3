//! Status enums for orders, payments and stock.
//!
//! String forms match the commerce API (`wc/v3`) wire values.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Order status as reported by the commerce API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    OnHold,
    Completed,
    Cancelled,
    Refunded,
    Failed,
    CheckoutDraft,
    /// Any status this storefront does not know about (plugins add their own).
    #[serde(other)]
    Unknown,
}

impl OrderStatus {
    /// Whether the order has been paid for.
    #[must_use]
    pub const fn is_paid(self) -> bool {
        matches!(self, Self::Processing | Self::Completed)
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending payment",
            Self::Processing => "Processing",
            Self::OnHold => "On hold",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
            Self::Refunded => "Refunded",
            Self::Failed => "Failed",
            Self::CheckoutDraft => "Draft",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How the customer pays for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Online payment through the payment gateway.
    #[default]
    Gateway,
    /// Cash on delivery; no gateway call is made.
    CashOnDelivery,
}

impl PaymentMethod {
    /// Value used in checkout form radio buttons.
    #[must_use]
    pub const fn form_value(self) -> &'static str {
        match self {
            Self::Gateway => "gateway",
            Self::CashOnDelivery => "cod",
        }
    }

    /// Payment method ID sent to the commerce API.
    #[must_use]
    pub const fn api_id(self) -> &'static str {
        match self {
            Self::Gateway => "novino",
            Self::CashOnDelivery => "cod",
        }
    }

    /// Title shown to customers and stored on the order.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Gateway => "Online payment",
            Self::CashOnDelivery => "Cash on delivery",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "gateway" | "novino" => Ok(Self::Gateway),
            "cod" => Ok(Self::CashOnDelivery),
            other => Err(format!("unknown payment method: {other}")),
        }
    }
}

/// Product stock status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StockStatus {
    #[default]
    InStock,
    OutOfStock,
    OnBackorder,
    #[serde(other)]
    Unknown,
}

impl StockStatus {
    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::InStock => "In stock",
            Self::OutOfStock => "Out of stock",
            Self::OnBackorder => "Available on backorder",
            Self::Unknown => "Availability unknown",
        }
    }

    /// CSS class for the label colour.
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::InStock => "stock-in",
            Self::OutOfStock => "stock-out",
            Self::OnBackorder => "stock-backorder",
            Self::Unknown => "stock-unknown",
        }
    }

    /// Whether the product can be added to the cart.
    #[must_use]
    pub const fn is_purchasable(self) -> bool {
        matches!(self, Self::InStock | Self::OnBackorder)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_wire_values() {
        let status: OrderStatus = serde_json::from_str("\"on-hold\"").unwrap();
        assert_eq!(status, OrderStatus::OnHold);
        let status: OrderStatus = serde_json::from_str("\"checkout-draft\"").unwrap();
        assert_eq!(status, OrderStatus::CheckoutDraft);
        assert_eq!(serde_json::to_string(&OrderStatus::Processing).unwrap(), "\"processing\"");
    }

    #[test]
    fn test_order_status_unknown_value() {
        let status: OrderStatus = serde_json::from_str("\"awaiting-shipment\"").unwrap();
        assert_eq!(status, OrderStatus::Unknown);
        assert!(!status.is_paid());
    }

    #[test]
    fn test_paid_statuses() {
        assert!(OrderStatus::Processing.is_paid());
        assert!(OrderStatus::Completed.is_paid());
        assert!(!OrderStatus::Pending.is_paid());
        assert!(!OrderStatus::Failed.is_paid());
    }

    #[test]
    fn test_payment_method_from_form() {
        assert_eq!("gateway".parse::<PaymentMethod>(), Ok(PaymentMethod::Gateway));
        assert_eq!("cod".parse::<PaymentMethod>(), Ok(PaymentMethod::CashOnDelivery));
        assert!("bitcoin".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn test_stock_status_wire_values() {
        let status: StockStatus = serde_json::from_str("\"onbackorder\"").unwrap();
        assert_eq!(status, StockStatus::OnBackorder);
        assert!(status.is_purchasable());
        let status: StockStatus = serde_json::from_str("\"outofstock\"").unwrap();
        assert!(!status.is_purchasable());
    }
}
