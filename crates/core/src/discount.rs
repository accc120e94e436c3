//! Coupon codes.
//!
//! The storefront accepts coupon codes on the cart page but the store does
//! not run any promotions yet. [`DiscountPolicy`] is where a real policy
//! plugs in; [`NoDiscounts`] rejects every code.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cart::Cart;

/// A discount granted for a coupon code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discount {
    pub code: String,
    /// Amount taken off the cart total.
    pub amount: Decimal,
}

/// Why a coupon code was rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CouponError {
    #[error("enter a coupon code")]
    Empty,
    #[error("coupon codes are not supported yet")]
    Unsupported,
    #[error("coupon {0} is not valid")]
    Invalid(String),
}

/// Decides whether a coupon code applies to a cart.
pub trait DiscountPolicy: Send + Sync {
    /// Evaluate `code` against `cart`.
    ///
    /// # Errors
    ///
    /// Returns a [`CouponError`] when the code does not apply.
    fn apply(&self, code: &str, cart: &Cart) -> Result<Discount, CouponError>;
}

/// Policy that rejects every code.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDiscounts;

impl DiscountPolicy for NoDiscounts {
    fn apply(&self, code: &str, _cart: &Cart) -> Result<Discount, CouponError> {
        if code.trim().is_empty() {
            Err(CouponError::Empty)
        } else {
            Err(CouponError::Unsupported)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_discounts_rejects_codes() {
        let cart = Cart::new();
        assert_eq!(NoDiscounts.apply("  ", &cart), Err(CouponError::Empty));
        assert_eq!(
            NoDiscounts.apply("SUMMER10", &cart),
            Err(CouponError::Unsupported)
        );
    }
}
