//! Database operations for storefront `PostgreSQL`.
//!
//! # Tables
//!
//! - `category`, `product_feature`, `product_feature_validator` - Catalog structure
//! - `product` - Shared product attributes with a `kind` discriminator
//! - `smartphone`, `notebook` - Variant attributes keyed by product id
//! - `customer`, `cart`, `cart_product`, `shop_order`, `customer_order` - Accounts and orders
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p gadget-shop-cli -- migrate
//! ```

pub mod accounts;
pub mod catalog;

use std::time::Duration;

use gadget_shop_core::ShopError;
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use accounts::{AccountRepository, StoredAccounts};
pub use catalog::CatalogRepository;

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Constraint violation (e.g., duplicate slug).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// Stored rows break a catalog or cart rule.
    #[error("invalid stored data: {0}")]
    Shop(#[from] ShopError),
}

/// Map unique violations to [`RepositoryError::Conflict`].
pub(crate) fn conflict_on_unique(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(
            db_err
                .constraint()
                .map_or_else(|| db_err.message().to_owned(), str::to_owned),
        );
    }
    RepositoryError::Database(err)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Check that the database answers.
///
/// # Errors
///
/// Returns `sqlx::Error` if the query fails.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await.map(|_| ())
}
