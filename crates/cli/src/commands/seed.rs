//! Seed the catalog from a YAML file.
//!
//! The seed is validated in full before connecting to the database, then
//! written in one transaction.

use std::path::Path;

use tracing::info;

use gadget_shop_storefront::db::{self, CatalogRepository};
use gadget_shop_storefront::seed::{CatalogSeed, SeedSummary};

use super::database_url;

/// Store a catalog seed file in the database.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is invalid, the database
/// URL is missing, or the database write fails.
pub async fn catalog(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    info!(path = %path.display(), "Loading catalog seed");
    let catalog = CatalogSeed::read(path).await?.build()?;
    let summary = SeedSummary::of(&catalog);

    let database_url = database_url()?;
    let pool = db::create_pool(&database_url).await?;
    info!("Connected to database");

    CatalogRepository::new(&pool).store(&catalog).await?;

    info!(
        categories = summary.categories,
        features = summary.features,
        validators = summary.validators,
        products = summary.products,
        "Seeding complete!"
    );
    Ok(())
}
