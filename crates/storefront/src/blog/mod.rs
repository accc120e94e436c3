//! Content REST API client (`wp/v2`) for blog posts.
//!
//! Posts are cached for an hour; searches bypass the cache.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use moka::future::Cache;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use autoparts_core::{ListingQuery, PostId};

use crate::html;
use crate::http::{self, Page};

const POSTS_TTL: Duration = Duration::from_secs(3600);

/// Errors that can occur when talking to the content API.
#[derive(Debug, Error)]
pub enum BlogError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// A `{"rendered": "..."}` field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Rendered {
    #[serde(default)]
    pub rendered: String,
}

/// A blog post.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Post {
    pub id: PostId,
    #[serde(default)]
    pub date: Option<NaiveDateTime>,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub title: Rendered,
    #[serde(default)]
    pub excerpt: Rendered,
    #[serde(default)]
    pub content: Rendered,
    /// Set by sites that expose the featured image URL on the post.
    #[serde(default)]
    pub featured_image_url: Option<String>,
}

impl Post {
    /// Title with markup and entities removed.
    #[must_use]
    pub fn plain_title(&self) -> String {
        html::strip_tags(&self.title.rendered)
    }

    /// Plain-text summary: the excerpt if there is one, else the content.
    #[must_use]
    pub fn summary(&self) -> String {
        let source = if html::strip_tags(&self.excerpt.rendered).is_empty() {
            &self.content.rendered
        } else {
            &self.excerpt.rendered
        };
        html::excerpt(source, html::EXCERPT_CHARS)
    }

    /// Display date, e.g. `2024-05-01`.
    #[must_use]
    pub fn display_date(&self) -> String {
        self.date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }
}

/// Cache key for post lookups.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    Post(PostId),
    Posts { page: u32, per_page: u32 },
}

#[derive(Debug, Clone)]
enum CacheValue {
    Post(Box<Post>),
    Posts(Page<Post>),
}

/// Client for the content REST API.
#[derive(Clone)]
pub struct BlogClient {
    inner: Arc<BlogClientInner>,
}

struct BlogClientInner {
    client: reqwest::Client,
    base_url: Url,
    cache: Cache<CacheKey, CacheValue>,
}

impl BlogClient {
    /// Create a new content API client.
    #[must_use]
    pub fn new(base_url: Url, client: reqwest::Client) -> Self {
        let cache = Cache::builder()
            .max_capacity(500)
            .time_to_live(POSTS_TTL)
            .build();
        Self {
            inner: Arc::new(BlogClientInner {
                client,
                base_url,
                cache,
            }),
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
        what: &str,
    ) -> Result<(T, reqwest::header::HeaderMap), BlogError> {
        let mut url = self.inner.base_url.join(path)?;
        if !params.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
        }

        let response = self
            .inner
            .client
            .get(url)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;
        let status = response.status();
        let headers = response.headers().clone();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(BlogError::RateLimited(http::retry_after(&headers)));
        }

        let body = response.text().await.map_err(reqwest::Error::without_url)?;

        // The content API answers 400 for pages past the end.
        if status == StatusCode::NOT_FOUND
            || http::error_code(&body).as_deref() == Some("rest_post_invalid_page_number")
        {
            return Err(BlogError::NotFound(what.to_owned()));
        }

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %http::truncate_body(&body),
                "Content API returned non-success status"
            );
            return Err(BlogError::Api {
                status: status.as_u16(),
                message: http::error_message(&body),
            });
        }

        let parsed = serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %http::truncate_body(&body),
                "Failed to parse content API response"
            );
            BlogError::Parse(e)
        })?;
        Ok((parsed, headers))
    }

    /// Get one page of posts, newest first.
    ///
    /// A page past the end yields an empty page rather than an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn posts(&self, query: &ListingQuery) -> Result<Page<Post>, BlogError> {
        let cache_key = CacheKey::Posts {
            page: query.page,
            per_page: query.per_page,
        };
        let cacheable = query.search.is_none();

        if cacheable
            && let Some(CacheValue::Posts(page)) = self.inner.cache.get(&cache_key).await
        {
            debug!("Cache hit for posts");
            return Ok(page);
        }

        let mut params = vec![
            ("page", query.page.to_string()),
            ("per_page", query.per_page.to_string()),
        ];
        if let Some(search) = &query.search {
            params.push(("search", search.clone()));
        }

        let page = match self.get::<Vec<Post>>("posts", &params, "posts").await {
            Ok((posts, headers)) => Page::from_headers(posts, &headers),
            Err(BlogError::NotFound(_)) => Page::empty(),
            Err(e) => return Err(e),
        };

        if cacheable {
            self.inner
                .cache
                .insert(cache_key, CacheValue::Posts(page.clone()))
                .await;
        }
        Ok(page)
    }

    /// Get the most recent posts.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn recent_posts(&self, limit: u32) -> Result<Vec<Post>, BlogError> {
        let mut query = ListingQuery::new(autoparts_core::ListingDefaults::BLOG);
        query.per_page = limit;
        Ok(self.posts(&query).await?.items)
    }

    /// Get a post by ID.
    ///
    /// # Errors
    ///
    /// Returns [`BlogError::NotFound`] for unknown posts, or another error if
    /// the API request fails.
    #[instrument(skip(self), fields(post_id = %id))]
    pub async fn post(&self, id: PostId) -> Result<Post, BlogError> {
        let cache_key = CacheKey::Post(id);
        if let Some(CacheValue::Post(post)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for post");
            return Ok(*post);
        }

        let (post, _) = self
            .get::<Post>(&format!("posts/{id}"), &[], &format!("post {id}"))
            .await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Post(Box::new(post.clone())))
            .await;
        Ok(post)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn post(excerpt: &str, content: &str) -> Post {
        serde_json::from_value(json!({
            "id": 7,
            "date": "2024-05-01T09:30:00",
            "slug": "choosing-brake-pads",
            "title": {"rendered": "Choosing &amp; fitting <em>brake pads</em>"},
            "excerpt": {"rendered": excerpt},
            "content": {"rendered": content}
        }))
        .unwrap()
    }

    #[test]
    fn test_plain_title() {
        assert_eq!(
            post("", "").plain_title(),
            "Choosing & fitting brake pads"
        );
    }

    #[test]
    fn test_summary_prefers_excerpt() {
        let p = post("<p>Short intro.</p>", "<p>Long body</p>");
        assert_eq!(p.summary(), "Short intro.");
    }

    #[test]
    fn test_summary_falls_back_to_content() {
        let long = format!("<p>{}</p>", "x".repeat(300));
        let p = post("", &long);
        let summary = p.summary();
        assert!(summary.ends_with("..."));
        assert_eq!(summary.chars().count(), html::EXCERPT_CHARS + 3);
    }

    #[test]
    fn test_display_date() {
        assert_eq!(post("", "").display_date(), "2024-05-01");
    }
}
