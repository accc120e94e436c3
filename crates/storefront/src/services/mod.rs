//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Sign-in through the JWT auth API, registration through the
//!   commerce API
//! - `cart` - Loading and saving the session cart
//! - `checkout` - Order submission and payment for a checkout attempt
//! - `notice` - One-shot notices carried across redirects
//! - `payment` - Payment gateway seam (HTTP or simulated)

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod notice;
pub mod payment;

pub use auth::{AuthClient, AuthError, AuthService};
pub use checkout::{CheckoutService, OrderApi, PaymentResult, SubmitOutcome};
pub use payment::{
    HttpPaymentGateway, PaymentError, PaymentGateway, PaymentOutcome, PaymentRequest,
    SimulatedGateway,
};
