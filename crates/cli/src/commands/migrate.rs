//! Session store migration.
//!
//! The storefront keeps no data of its own beyond sessions, so the only
//! schema it needs is the one `tower-sessions-sqlx-store` manages.
//!
//! # Usage
//!
//! ```bash
//! autoparts-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

use secrecy::SecretString;
use thiserror::Error;
use tower_sessions_sqlx_store::PostgresStore;

use autoparts_storefront::{db, middleware};

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

fn database_url() -> Result<SecretString, MigrationError> {
    std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| MigrationError::MissingEnvVar("STOREFRONT_DATABASE_URL"))
}

/// Create the session schema and table.
///
/// Safe to run repeatedly; the store only creates what is missing.
///
/// # Errors
///
/// Returns an error if the database URL is missing or the migration fails.
pub async fn session_store() -> Result<(), MigrationError> {
    dotenvy::dotenv().ok();

    let database_url = database_url()?;

    tracing::info!("Connecting to storefront database...");
    let pool = db::create_pool(&database_url).await?;

    tracing::info!("Running session store migration...");
    let store: PostgresStore = middleware::postgres_store(&pool);
    store.migrate().await?;

    tracing::info!("Session store migration complete");
    Ok(())
}
