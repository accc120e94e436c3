//! Blog route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, RawQuery, State},
    response::IntoResponse,
};
use tracing::instrument;

use autoparts_core::{ListingDefaults, ListingQuery, PostId};

use super::pagination::Pagination;
use crate::blog::Post;
use crate::error::AppError;
use crate::filters;
use crate::html;
use crate::middleware::PageContext;
use crate::state::AppState;

/// Number of recent posts in the post sidebar.
const SIDEBAR_POSTS: u32 = 5;

/// Post summary for listings.
#[derive(Clone)]
pub struct PostCard {
    pub url: String,
    pub title: String,
    pub summary: String,
    pub date: String,
    pub image: Option<String>,
}

impl From<&Post> for PostCard {
    fn from(post: &Post) -> Self {
        Self {
            url: format!("/blog/{}", post.id),
            title: post.plain_title(),
            summary: post.summary(),
            date: post.display_date(),
            image: post.featured_image_url.clone(),
        }
    }
}

/// Blog listing template.
#[derive(Template, WebTemplate)]
#[template(path = "blog/index.html")]
pub struct BlogIndexTemplate {
    pub page: PageContext,
    pub posts: Vec<PostCard>,
    pub pagination: Pagination,
    pub search: String,
    pub error: Option<&'static str>,
}

/// Blog post template.
#[derive(Template, WebTemplate)]
#[template(path = "blog/show.html")]
pub struct BlogShowTemplate {
    pub page: PageContext,
    pub title: String,
    pub date: String,
    pub image: Option<String>,
    pub content: String,
    pub recent: Vec<PostCard>,
}

/// Display the post listing.
#[instrument(skip(state, page))]
pub async fn index(
    State(state): State<AppState>,
    page: PageContext,
    RawQuery(raw): RawQuery,
) -> impl IntoResponse {
    let query = ListingQuery::parse(ListingDefaults::BLOG, raw.as_deref().unwrap_or(""));

    let (posts, pagination, error) = match state.blog().posts(&query).await {
        Ok(result) => (
            result.items.iter().map(PostCard::from).collect(),
            Pagination::new(&query, "/blog", result.total_pages),
            None,
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load posts");
            (
                Vec::new(),
                Pagination::default(),
                Some("We could not load the blog right now. Please try again in a moment."),
            )
        }
    };

    BlogIndexTemplate {
        page,
        posts,
        pagination,
        search: query.search.unwrap_or_default(),
        error,
    }
}

/// Display a post.
#[instrument(skip(state, page))]
pub async fn show(
    State(state): State<AppState>,
    page: PageContext,
    Path(id): Path<PostId>,
) -> Result<impl IntoResponse, AppError> {
    let post = state.blog().post(id).await?;

    let recent = match state.blog().recent_posts(SIDEBAR_POSTS).await {
        Ok(posts) => posts
            .iter()
            .filter(|p| p.id != post.id)
            .map(PostCard::from)
            .collect(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load recent posts");
            Vec::new()
        }
    };

    Ok(BlogShowTemplate {
        page,
        title: post.plain_title(),
        date: post.display_date(),
        image: post.featured_image_url.clone(),
        content: html::sanitize(&post.content.rendered),
        recent,
    })
}
