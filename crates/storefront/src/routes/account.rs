//! Account route handlers.
//!
//! These routes require a signed-in customer.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use autoparts_core::{CurrencyCode, ListingDefaults, ListingQuery, OrderStatus};

use super::pagination::Pagination;
use crate::commerce::{CommerceError, Order};
use crate::filters;
use crate::http::Page;
use crate::middleware::{PageContext, RequireAuth};
use crate::models::CurrentCustomer;
use crate::state::AppState;

/// Number of orders on the account overview.
const RECENT_ORDERS: usize = 5;

/// Page size of the order history (matches the commerce client).
const ORDERS_PER_PAGE: u32 = 10;

/// Order display data for templates.
#[derive(Clone)]
pub struct OrderView {
    pub number: String,
    pub date: String,
    pub status: &'static str,
    pub status_class: &'static str,
    pub total: String,
    pub item_count: u32,
}

impl OrderView {
    #[must_use]
    pub fn new(order: &Order, currency: CurrencyCode) -> Self {
        Self {
            number: order.display_number(),
            date: order
                .date_created
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            status: order.status.label(),
            status_class: status_class(order.status),
            total: currency.format(order.total_amount()),
            item_count: order.line_items.iter().map(|l| l.quantity).sum(),
        }
    }
}

const fn status_class(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Completed | OrderStatus::Processing => "status-ok",
        OrderStatus::Failed | OrderStatus::Cancelled | OrderStatus::Refunded => "status-bad",
        _ => "status-pending",
    }
}

/// Order history query parameters.
#[derive(Debug, Deserialize)]
pub struct OrdersQuery {
    pub page: Option<u32>,
}

/// Account overview page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/index.html")]
pub struct AccountIndexTemplate {
    pub page: PageContext,
    pub name: String,
    pub email: String,
    pub recent_orders: Vec<OrderView>,
    pub error: Option<&'static str>,
}

/// Order history page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/orders.html")]
pub struct AccountOrdersTemplate {
    pub page: PageContext,
    pub orders: Vec<OrderView>,
    pub pagination: Pagination,
    pub error: Option<&'static str>,
}

const ORDERS_UNAVAILABLE: &str = "We could not load your orders right now.";

/// Fetch a page of the customer's orders.
///
/// Accounts without a commerce customer record are matched by email.
async fn customer_orders(
    state: &AppState,
    customer: &CurrentCustomer,
    page: u32,
) -> Result<Page<Order>, CommerceError> {
    match customer.customer_id {
        Some(id) => state.commerce().orders_for_customer(id, page).await,
        None if page <= 1 => {
            let orders = state.commerce().orders_for_email(&customer.email).await?;
            let total = u32::try_from(orders.len()).unwrap_or(u32::MAX);
            Ok(Page {
                total_pages: u32::from(total > 0),
                total,
                items: orders,
            })
        }
        None => Ok(Page::empty()),
    }
}

/// Display account overview page.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(customer): RequireAuth,
    page: PageContext,
) -> impl IntoResponse {
    let currency = state.currency();
    let (recent_orders, error) = match customer_orders(&state, &customer, 1).await {
        Ok(result) => (
            result
                .items
                .iter()
                .take(RECENT_ORDERS)
                .map(|o| OrderView::new(o, currency))
                .collect(),
            None,
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load recent orders");
            (Vec::new(), Some(ORDERS_UNAVAILABLE))
        }
    };

    AccountIndexTemplate {
        page,
        name: customer.greeting_name().to_owned(),
        email: customer.email,
        recent_orders,
        error,
    }
}

/// Display the order history.
#[instrument(skip_all)]
pub async fn orders(
    State(state): State<AppState>,
    RequireAuth(customer): RequireAuth,
    page: PageContext,
    Query(query): Query<OrdersQuery>,
) -> impl IntoResponse {
    let listing = ListingQuery::new(ListingDefaults {
        per_page: ORDERS_PER_PAGE,
        search_key: "search",
    })
    .with_page(query.page.unwrap_or(1));

    let currency = state.currency();
    let (orders, pagination, error) = match customer_orders(&state, &customer, listing.page).await {
        Ok(result) => (
            result
                .items
                .iter()
                .map(|o| OrderView::new(o, currency))
                .collect(),
            Pagination::new(&listing, "/account/orders", result.total_pages),
            None,
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load order history");
            (Vec::new(), Pagination::default(), Some(ORDERS_UNAVAILABLE))
        }
    };

    AccountOrdersTemplate {
        page,
        orders,
        pagination,
        error,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_order_view() {
        let order: Order = serde_json::from_value(json!({
            "id": 1001,
            "number": "1001",
            "status": "processing",
            "total": "2900000",
            "date_created": "2024-05-01T10:20:30",
            "line_items": [
                {"id": 1, "name": "Brake pad set", "product_id": 101, "quantity": 2, "total": "2900000"}
            ]
        }))
        .unwrap();

        let view = OrderView::new(&order, CurrencyCode::IRR);
        assert_eq!(view.number, "1001");
        assert_eq!(view.date, "2024-05-01");
        assert_eq!(view.total, "2,900,000 IRR");
        assert_eq!(view.item_count, 2);
        assert_eq!(view.status_class, "status-ok");
    }
}
