//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use autoparts_core::{ListingDefaults, ListingQuery};

use super::blog::PostCard;
use super::products::{CategoryLink, ProductCard, load_categories};
use crate::filters;
use crate::middleware::PageContext;
use crate::state::AppState;

/// Number of featured products on the home page.
const FEATURED_LIMIT: u32 = 8;

/// Number of recent posts on the home page.
const RECENT_POSTS_LIMIT: u32 = 3;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub page: PageContext,
    pub featured_products: Vec<ProductCard>,
    pub categories: Vec<CategoryLink>,
    pub posts: Vec<PostCard>,
}

/// Display the home page.
///
/// Each section loads independently; a section whose API call fails is
/// left out.
#[instrument(skip(state, page))]
pub async fn home(State(state): State<AppState>, page: PageContext) -> impl IntoResponse {
    let (featured, categories, posts) = tokio::join!(
        state.commerce().featured_products(FEATURED_LIMIT),
        load_categories(&state),
        state.blog().recent_posts(RECENT_POSTS_LIMIT),
    );

    let currency = state.currency();
    let featured_products = match featured {
        Ok(products) => products
            .iter()
            .map(|p| ProductCard::new(p, currency))
            .collect(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load featured products");
            Vec::new()
        }
    };

    let posts = match posts {
        Ok(posts) => posts.iter().map(PostCard::from).collect(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load recent posts");
            Vec::new()
        }
    };

    let empty = ListingQuery::new(ListingDefaults::PRODUCTS);
    HomeTemplate {
        page,
        featured_products,
        categories: CategoryLink::tree(&categories, &empty),
        posts,
    }
}
