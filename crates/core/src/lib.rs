//! Autoparts Core - Shared domain types and storefront logic.
//!
//! This crate provides the pieces of the storefront that do not touch the
//! network:
//! - [`types`] - Newtype IDs, email/phone, prices and status enums
//! - [`cart`] - The cart store (add, update, remove, clear, totals)
//! - [`discount`] - Coupon extension point
//! - [`listing`] - Listing query strings and page-number windows
//! - [`checkout`] - Checkout form validation and the checkout state machine
//! - [`validation`] - Field-level validation errors shared by all forms
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP clients. The storefront crate owns persistence and remote
//! calls and drives these types.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod checkout;
pub mod discount;
pub mod listing;
pub mod types;
pub mod validation;

pub use cart::{Cart, CartItem, CartProduct};
pub use checkout::{
    CheckoutAttempt, CheckoutEvent, CheckoutForm, CheckoutStage, PlacedOrder, TransitionError,
    ValidatedCheckout,
};
pub use discount::{CouponError, Discount, DiscountPolicy, NoDiscounts};
pub use listing::{ListingDefaults, ListingQuery, SortBy, SortOrder, page_window};
pub use types::*;
pub use validation::FieldErrors;
