//! Cart route handlers.
//!
//! The cart lives in the visitor's session. Every mutation is a form post
//! that saves the cart and redirects back to the cart page with a notice.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use autoparts_core::{Cart, CartItem, CartProduct, CurrencyCode, ProductId};

use crate::error::add_breadcrumb;
use crate::filters;
use crate::html;
use crate::middleware::PageContext;
use crate::models::Notice;
use crate::services::{cart, notice};
use crate::state::AppState;

/// Cart line display data for templates.
#[derive(Clone)]
pub struct CartLineView {
    pub id: ProductId,
    pub name: String,
    pub url: String,
    pub image: Option<String>,
    pub unit_price: String,
    pub regular_price: Option<String>,
    pub discount: u32,
    pub quantity: u32,
    pub line_total: String,
}

impl CartLineView {
    #[must_use]
    pub fn new(item: &CartItem, currency: CurrencyCode) -> Self {
        let discount = item.discount_percentage();
        Self {
            id: item.id(),
            name: item.product.name.clone(),
            url: format!("/product/{}", item.id()),
            image: item.product.image.clone(),
            unit_price: currency.format(item.product.unit_price),
            regular_price: item
                .product
                .regular_price
                .filter(|_| discount > 0)
                .map(|p| currency.format(p)),
            discount,
            quantity: item.quantity,
            line_total: currency.format(item.line_total()),
        }
    }
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub total: String,
    pub item_count: u32,
}

impl CartView {
    #[must_use]
    pub fn new(cart: &Cart, currency: CurrencyCode) -> Self {
        Self {
            lines: cart
                .items()
                .iter()
                .map(|item| CartLineView::new(item, currency))
                .collect(),
            total: currency.format(cart.total_price()),
            item_count: cart.total_items(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: ProductId,
    pub quantity: Option<u32>,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: ProductId,
}

/// Coupon form data.
#[derive(Debug, Deserialize)]
pub struct CouponForm {
    #[serde(default)]
    pub code: String,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub page: PageContext,
    pub cart: CartView,
}

/// Cart count badge fragment template.
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

/// Display cart page.
#[instrument(skip(state, session, page))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
) -> impl IntoResponse {
    let cart = cart::load(&session).await;
    CartShowTemplate {
        page,
        cart: CartView::new(&cart, state.currency()),
    }
}

/// Add a product to the cart.
///
/// The product is fetched so the cart line carries the current name, price
/// and image.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AddToCartForm>,
) -> impl IntoResponse {
    let product = match state.commerce().product(form.product_id).await {
        Ok(product) => product,
        Err(e) => {
            tracing::warn!(error = %e, product_id = %form.product_id, "Failed to load product for cart");
            notice::flash(&session, Notice::error(e.customer_message())).await;
            return Redirect::to("/cart");
        }
    };

    let product_url = format!("/product/{}", product.id);
    let Some(unit_price) = product.unit_price().filter(|_| product.is_purchasable()) else {
        notice::flash(
            &session,
            Notice::error("This product is not available to order right now."),
        )
        .await;
        return Redirect::to(&product_url);
    };

    let name = html::decode_entities(&product.name);
    let mut cart = cart::load(&session).await;
    cart.add_item(
        CartProduct {
            id: product.id,
            name: name.clone(),
            unit_price,
            regular_price: product.was_price(),
            image: product.primary_image().map(|img| img.src.clone()),
        },
        form.quantity.unwrap_or(1),
    );
    cart::save(&session, &cart).await;

    let id = product.id.to_string();
    add_breadcrumb("cart", "Added to cart", Some(&[("product_id", id.as_str())]));
    notice::flash(&session, Notice::success(format!("{name} was added to your cart."))).await;
    Redirect::to("/cart")
}

/// Change the quantity of a cart line. Quantities below one become one.
#[instrument(skip(session))]
pub async fn update(session: Session, Form(form): Form<UpdateCartForm>) -> impl IntoResponse {
    let mut cart = cart::load(&session).await;
    if cart.update_quantity(form.product_id, form.quantity) {
        cart::save(&session, &cart).await;
        notice::flash(&session, Notice::success("Your cart was updated.")).await;
    }
    Redirect::to("/cart")
}

/// Remove a line from the cart.
#[instrument(skip(session))]
pub async fn remove(session: Session, Form(form): Form<RemoveFromCartForm>) -> impl IntoResponse {
    let mut cart = cart::load(&session).await;
    if cart.remove_item(form.product_id) {
        cart::save(&session, &cart).await;
        notice::flash(&session, Notice::info("The item was removed from your cart.")).await;
    }
    Redirect::to("/cart")
}

/// Empty the cart.
#[instrument(skip(session))]
pub async fn clear(session: Session) -> impl IntoResponse {
    let mut cart = cart::load(&session).await;
    if !cart.is_empty() {
        cart.clear();
        cart::save(&session, &cart).await;
        notice::flash(&session, Notice::info("Your cart is now empty.")).await;
    }
    Redirect::to("/cart")
}

/// Apply a coupon code.
#[instrument(skip(state, session))]
pub async fn coupon(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<CouponForm>,
) -> impl IntoResponse {
    let cart = cart::load(&session).await;
    let notice = match state.discounts().apply(&form.code, &cart) {
        Ok(discount) => Notice::success(format!(
            "Coupon {} applied: {} off.",
            discount.code,
            state.currency().format(discount.amount)
        )),
        Err(e) => Notice::error(capitalize(&e.to_string())),
    };
    notice::flash(&session, notice).await;
    Redirect::to("/cart")
}

/// Cart count badge fragment.
#[instrument(skip(session))]
pub async fn count(session: Session) -> impl IntoResponse {
    let cart = cart::load(&session).await;
    CartCountTemplate {
        count: cart.total_items(),
    }
}

fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn item(unit: i64, regular: Option<i64>, quantity: u32) -> CartItem {
        CartItem {
            product: CartProduct {
                id: ProductId::new(5),
                name: "Oil filter".into(),
                unit_price: Decimal::new(unit, 0),
                regular_price: regular.map(|r| Decimal::new(r, 0)),
                image: None,
            },
            quantity,
        }
    }

    #[test]
    fn test_line_view_with_discount() {
        let line = CartLineView::new(&item(80_000, Some(100_000), 3), CurrencyCode::IRR);
        assert_eq!(line.unit_price, "80,000 IRR");
        assert_eq!(line.regular_price.as_deref(), Some("100,000 IRR"));
        assert_eq!(line.discount, 20);
        assert_eq!(line.line_total, "240,000 IRR");
        assert_eq!(line.url, "/product/5");
    }

    #[test]
    fn test_line_view_hides_regular_price_without_discount() {
        let line = CartLineView::new(&item(100_000, Some(100_000), 1), CurrencyCode::IRR);
        assert_eq!(line.regular_price, None);
        assert_eq!(line.discount, 0);
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("coupon codes are not supported yet"), "Coupon codes are not supported yet");
        assert_eq!(capitalize(""), "");
    }
}
