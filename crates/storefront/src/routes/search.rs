//! Search results handler.

use axum::{
    extract::{RawQuery, State},
    response::IntoResponse,
};
use tracing::instrument;

use autoparts_core::{ListingDefaults, ListingQuery};

use super::pagination::Pagination;
use super::products::{CategoryLink, ProductsIndexTemplate, load_categories, render_listing};
use crate::middleware::PageContext;
use crate::state::AppState;

/// Display search results for `q`.
///
/// Without a search term nothing is fetched.
#[instrument(skip(state, page))]
pub async fn search(
    State(state): State<AppState>,
    page: PageContext,
    RawQuery(raw): RawQuery,
) -> impl IntoResponse {
    let query = ListingQuery::parse(ListingDefaults::SEARCH, raw.as_deref().unwrap_or(""));
    let categories = load_categories(&state).await;

    let Some(term) = query.search.clone() else {
        return ProductsIndexTemplate {
            page,
            heading: "Search".to_owned(),
            products: Vec::new(),
            categories: CategoryLink::tree(&categories, &query),
            pagination: Pagination::default(),
            total: 0,
            error: None,
            search: String::new(),
            min_price: String::new(),
            max_price: String::new(),
            orderby: String::new(),
            action: "/search".to_owned(),
            search_key: query.defaults().search_key,
            filtered: query.has_filters(),
            empty_message: "Type a part name or number to search the catalog.",
        };
    };

    tracing::debug!(%term, "Searching products");
    let mut listing = render_listing(
        &state,
        page,
        query,
        "/search",
        format!("Search results for \u{201c}{term}\u{201d}"),
        &categories,
    )
    .await;
    listing.empty_message = "No products matched your search.";
    listing
}
