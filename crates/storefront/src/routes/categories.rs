//! Category listing handler.

use axum::{
    extract::{Path, RawQuery, State},
    response::IntoResponse,
};
use tracing::instrument;

use autoparts_core::{CategoryId, ListingDefaults, ListingQuery};

use super::products::{load_categories, render_listing};
use crate::error::AppError;
use crate::html;
use crate::middleware::PageContext;
use crate::state::AppState;

/// Display the products in a category.
///
/// The path's category always comes first so it is the one sent to the
/// commerce API; other selected categories stay in the page links.
#[instrument(skip(state, page))]
pub async fn show(
    State(state): State<AppState>,
    page: PageContext,
    Path(id): Path<CategoryId>,
    RawQuery(raw): RawQuery,
) -> Result<impl IntoResponse, AppError> {
    let category = state.commerce().category(id).await?;

    let mut query = ListingQuery::parse(ListingDefaults::PRODUCTS, raw.as_deref().unwrap_or(""));
    query.categories.retain(|c| *c != id);
    query.categories.insert(0, id);

    let categories = load_categories(&state).await;
    let path = format!("/category/{id}");
    let mut listing = render_listing(
        &state,
        page,
        query,
        &path,
        html::decode_entities(&category.name),
        &categories,
    )
    .await;
    listing.empty_message = "There are no products in this category yet.";
    Ok(listing)
}
