//! Connectivity checks for the services the storefront depends on.
//!
//! Uses the same configuration as the server, so a passing `ping` means
//! the storefront can start and reach everything it needs.

use thiserror::Error;

use autoparts_storefront::blog::{BlogClient, BlogError};
use autoparts_storefront::commerce::{CommerceClient, CommerceError};
use autoparts_storefront::config::{ConfigError, StorefrontConfig};
use autoparts_storefront::db;

/// Errors reported by `ping`.
#[derive(Debug, Error)]
pub enum PingError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Database unreachable: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Commerce API unreachable: {0}")]
    Commerce(#[from] CommerceError),

    #[error("Content API unreachable: {0}")]
    Blog(#[from] BlogError),
}

/// Probe the database, the commerce API and the content API in turn.
///
/// # Errors
///
/// Returns the first failure.
pub async fn all(skip_database: bool) -> Result<(), PingError> {
    let config = StorefrontConfig::from_env()?;

    if skip_database {
        tracing::info!("Skipping database check");
    } else {
        let pool = db::create_pool(&config.database_url).await?;
        db::ping(&pool).await?;
        tracing::info!("Database OK");
    }

    let client = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()?;

    let commerce = CommerceClient::new(&config.commerce, client.clone());
    commerce.ping().await?;
    tracing::info!(api = %config.commerce.api_url, "Commerce API OK");

    let blog = BlogClient::new(config.blog_api_url.clone(), client);
    let posts = blog.recent_posts(1).await?;
    tracing::info!(api = %config.blog_api_url, posts = posts.len(), "Content API OK");

    Ok(())
}
