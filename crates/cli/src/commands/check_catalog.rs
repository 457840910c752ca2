//! Validate a catalog seed file without a database.

use std::path::Path;

use tracing::{error, info};

use gadget_shop_storefront::seed::{CatalogSeed, SeedError, SeedSummary};

/// Parse and build the seed, logging a summary.
///
/// # Errors
///
/// Returns the first problem found in the file.
pub async fn run(path: &Path) -> Result<SeedSummary, SeedError> {
    info!(path = %path.display(), "Checking catalog seed");

    let catalog = match CatalogSeed::read(path).await.and_then(CatalogSeed::build) {
        Ok(catalog) => catalog,
        Err(e) => {
            error!("Catalog seed is invalid: {e}");
            return Err(e);
        }
    };

    let summary = SeedSummary::of(&catalog);
    info!("Catalog seed is valid");
    info!("  Categories: {}", summary.categories);
    info!("  Features: {}", summary.features);
    info!("  Validators: {}", summary.validators);
    info!("  Products: {}", summary.products);
    Ok(summary)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use super::*;

    const SEED: &str = r#"
categories:
  - name: Notebooks
    slug: notebooks
features:
  - category: notebooks
    key: ram
    name: RAM
    use_in_filter: true
products:
  - category: notebooks
    type: notebook
    title: Air 13
    slug: air-13
    image: air-13.jpg
    price: "999.00"
    diagonal: "13.3"
    display: IPS
    processor_frequency: "3.2"
    ram: "8"
    video_chipset: Integrated
    battery_life: "15"
"#;

    fn seed_file(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_valid_seed() {
        let file = seed_file(SEED);
        let summary = run(file.path()).await.unwrap();
        assert_eq!(summary.categories, 1);
        assert_eq!(summary.features, 1);
        assert_eq!(summary.products, 1);
    }

    #[tokio::test]
    async fn test_unknown_category_is_reported() {
        let file = seed_file(&SEED.replace("  - category: notebooks\n    type", "  - category: tablets\n    type"));
        let err = run(file.path()).await.unwrap_err();
        assert!(matches!(err, SeedError::Catalog { ref entry, .. } if entry == "products[0]"));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = run(Path::new("/nonexistent/catalog.yaml")).await.unwrap_err();
        assert!(matches!(err, SeedError::Io(_)));
    }
}
