//! Catalog seed files.
//!
//! A seed is a YAML document listing categories, features, validators and
//! products. Rows refer to each other by category slug and feature key rather
//! than by id, so a seed can be written by hand:
//!
//! ```yaml
//! categories:
//!   - name: Smartphones
//!     slug: smartphones
//! features:
//!   - category: smartphones
//!     key: ram
//!     name: RAM
//!     postfix: GB
//!     use_in_filter: true
//! validators:
//!   - category: smartphones
//!     feature: ram
//!     value: "8"
//! products:
//!   - category: smartphones
//!     type: smartphone
//!     title: Pixel 8
//!     slug: pixel-8
//!     # ...
//! ```

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use gadget_shop_core::{
    Catalog, FilterKind, NewCategory, NewFeature, NewProduct, NewValidator, ShopError,
};

/// Errors raised while loading a seed.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid seed YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{entry}: {source}")]
    Catalog {
        /// Which seed entry was rejected, e.g. `products[2]`.
        entry: String,
        #[source]
        source: ShopError,
    },
}

/// Parsed seed document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogSeed {
    pub categories: Vec<NewCategory>,
    pub features: Vec<SeedFeature>,
    pub validators: Vec<SeedValidator>,
    pub products: Vec<SeedProduct>,
}

/// Feature entry, referencing its category by slug.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedFeature {
    pub category: String,
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub postfix: Option<String>,
    #[serde(default)]
    pub filter_measure: Option<String>,
    #[serde(default)]
    pub use_in_filter: bool,
    #[serde(default)]
    pub filter_kind: FilterKind,
}

/// Validator entry, referencing its category by slug and feature by key.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedValidator {
    pub category: String,
    #[serde(default)]
    pub feature: Option<String>,
    pub value: String,
}

/// Product entry, referencing its category by slug.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedProduct {
    pub category: String,
    #[serde(flatten)]
    pub product: NewProduct,
}

/// Row counts of a built catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub categories: usize,
    pub features: usize,
    pub validators: usize,
    pub products: usize,
}

impl SeedSummary {
    /// Count the rows of a catalog.
    #[must_use]
    pub fn of(catalog: &Catalog) -> Self {
        Self {
            categories: catalog.categories().count(),
            features: catalog.all_features().count(),
            validators: catalog.validators().count(),
            products: catalog.products().count(),
        }
    }
}

impl CatalogSeed {
    /// Parse a seed from YAML text.
    ///
    /// # Errors
    ///
    /// Returns `SeedError::Yaml` if the document does not match the format.
    pub fn from_yaml(text: &str) -> Result<Self, SeedError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Read and parse a seed file.
    ///
    /// # Errors
    ///
    /// Returns `SeedError::Io` or `SeedError::Yaml`.
    pub async fn read(path: &Path) -> Result<Self, SeedError> {
        let text = tokio::fs::read_to_string(path).await?;
        Self::from_yaml(&text)
    }

    /// Build a catalog from the seed, assigning ids in document order.
    ///
    /// # Errors
    ///
    /// Returns `SeedError::Catalog` naming the first entry the catalog
    /// rejects.
    pub fn build(self) -> Result<Catalog, SeedError> {
        let mut catalog = Catalog::new();

        for (i, category) in self.categories.into_iter().enumerate() {
            catalog
                .add_category(category)
                .map_err(|e| rejected("categories", i, e))?;
        }

        for (i, feature) in self.features.into_iter().enumerate() {
            let category_id = catalog
                .category_by_slug(&feature.category)
                .map_err(|e| rejected("features", i, e))?
                .id;
            catalog
                .add_feature(NewFeature {
                    category_id,
                    key: feature.key,
                    name: feature.name,
                    postfix: feature.postfix,
                    filter_measure: feature.filter_measure,
                    use_in_filter: feature.use_in_filter,
                    filter_kind: feature.filter_kind,
                })
                .map_err(|e| rejected("features", i, e))?;
        }

        for (i, validator) in self.validators.into_iter().enumerate() {
            let category_id = catalog
                .category_by_slug(&validator.category)
                .map_err(|e| rejected("validators", i, e))?
                .id;
            let feature_id = match &validator.feature {
                Some(key) => Some(
                    catalog
                        .features(category_id)
                        .find(|f| &f.key == key)
                        .ok_or_else(|| {
                            rejected("validators", i, ShopError::not_found("feature", key))
                        })?
                        .id,
                ),
                None => None,
            };
            catalog
                .add_validator(NewValidator {
                    category_id,
                    feature_id,
                    value: validator.value,
                })
                .map_err(|e| rejected("validators", i, e))?;
        }

        for (i, entry) in self.products.into_iter().enumerate() {
            let category_id = catalog
                .category_by_slug(&entry.category)
                .map_err(|e| rejected("products", i, e))?
                .id;
            catalog
                .add_product(NewProduct {
                    category_id: Some(category_id),
                    ..entry.product
                })
                .map_err(|e| rejected("products", i, e))?;
        }

        Ok(catalog)
    }
}

fn rejected(list: &str, index: usize, source: ShopError) -> SeedError {
    SeedError::Catalog {
        entry: format!("{list}[{index}]"),
        source,
    }
}
