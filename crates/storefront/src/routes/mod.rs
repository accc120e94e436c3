//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                        - Home page
//!
//! # Catalog
//! GET  /products                - Product listing (filters + pagination)
//! GET  /product/{id}            - Product detail
//! GET  /category/{id}           - Category listing
//! GET  /search?q=               - Search results
//!
//! # Cart (form posts, redirect back)
//! GET  /cart                    - Cart page
//! POST /cart/add                - Add a product
//! POST /cart/update             - Change a line's quantity
//! POST /cart/remove             - Remove a line
//! POST /cart/clear              - Empty the cart
//! POST /cart/coupon             - Apply a coupon code
//! GET  /cart/count              - Cart count badge (fragment)
//!
//! # Checkout
//! GET  /checkout                - Checkout form
//! POST /checkout                - Validate and place the order
//! GET  /checkout/payment        - Payment page for the placed order
//! POST /checkout/payment        - Pay (or retry)
//! POST /checkout/abandon        - Back to the cart
//! GET  /checkout/confirmation   - Confirmation page
//!
//! # Content
//! GET  /blog                    - Post listing
//! GET  /blog/{id}               - Post
//! GET  /contact                 - Contact form
//! POST /contact                 - Send a message
//!
//! # Auth
//! GET  /auth/login              - Login page
//! POST /auth/login              - Login action
//! GET  /auth/register           - Register page
//! POST /auth/register           - Register action
//! POST /auth/logout             - Logout action
//!
//! # Account (requires auth)
//! GET  /account                 - Account overview
//! GET  /account/orders          - Order history
//! ```

pub mod account;
pub mod auth;
pub mod blog;
pub mod cart;
pub mod categories;
pub mod checkout;
pub mod contact;
pub mod home;
pub mod pagination;
pub mod products;
pub mod search;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::{auth_rate_limiter, checkout_rate_limiter};
use crate::state::AppState;

/// Create the auth routes router.
///
/// Only the form posts are rate limited.
pub fn auth_routes() -> Router<AppState> {
    let limited = Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .layer(auth_rate_limiter());

    Router::new()
        .route("/login", get(auth::login_page))
        .route("/register", get(auth::register_page))
        .route("/logout", post(auth::logout))
        .merge(limited)
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/coupon", post(cart::coupon))
        .route("/count", get(cart::count))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    let limited = Router::new()
        .route("/", post(checkout::submit))
        .route("/payment", post(checkout::pay))
        .layer(checkout_rate_limiter());

    Router::new()
        .route("/", get(checkout::show))
        .route("/payment", get(checkout::payment))
        .route("/abandon", post(checkout::abandon))
        .route("/confirmation", get(checkout::confirmation))
        .merge(limited)
}

/// Create the blog routes router.
pub fn blog_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(blog::index))
        .route("/{id}", get(blog::show))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::index))
        .route("/orders", get(account::orders))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Home page
        .route("/", get(home::home))
        // Catalog
        .route("/products", get(products::index))
        .route("/product/{id}", get(products::show))
        .route("/category/{id}", get(categories::show))
        .route("/search", get(search::search))
        // Cart and checkout
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        // Content
        .nest("/blog", blog_routes())
        .route("/contact", get(contact::show).post(contact::submit))
        // Account
        .nest("/account", account_routes())
        .nest("/auth", auth_routes())
}
