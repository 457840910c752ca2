//! Categories, product features and the product registry.
//!
//! The [`Catalog`] is the read model the storefront serves from. Catalog
//! administration fills it through the `add_*` methods (which assign ids) or
//! the `insert_*` methods (which keep ids loaded from storage); both enforce
//! the same invariants:
//!
//! - category and product slugs are unique
//! - a feature key is unique within its category
//! - a validator value is unique across the whole catalog
//! - every reference points at an existing row

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ShopError, check_len, check_text};
use crate::product::{NewProduct, Product, ProductKind};
use crate::types::{CategoryId, FeatureId, FilterKind, ProductId, Slug, ValidatorId};

const MAX_NAME_LENGTH: usize = 255;
const MAX_KEY_LENGTH: usize = 100;
const MAX_POSTFIX_LENGTH: usize = 20;
const MAX_MEASURE_LENGTH: usize = 50;
const MAX_VALUE_LENGTH: usize = 255;

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: Slug,
}

impl Category {
    /// The category's canonical URL path.
    #[must_use]
    pub fn url(&self) -> String {
        format!("/category/{}/", self.slug)
    }
}

/// Category input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub slug: String,
}

/// A characteristic products of one category share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFeature {
    pub id: FeatureId,
    pub category_id: CategoryId,
    /// Internal identifier, matches a product attribute name.
    pub key: String,
    /// Display name.
    pub name: String,
    /// Appended to values when displayed, e.g. `"GB"`.
    pub postfix: Option<String>,
    /// Unit shown next to a filter value.
    pub filter_measure: Option<String>,
    pub use_in_filter: bool,
    pub filter_kind: FilterKind,
}

/// Feature input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFeature {
    pub category_id: CategoryId,
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

/// One allowed value for a feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFeatureValidator {
    pub id: ValidatorId,
    pub category_id: CategoryId,
    /// `None` while the validator is not yet tied to a feature.
    pub feature_id: Option<FeatureId>,
    pub value: String,
}

/// Validator input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewValidator {
    pub category_id: CategoryId,
    #[serde(default)]
    pub feature_id: Option<FeatureId>,
    pub value: String,
}

/// A feature as the filter UI needs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterableFeature {
    pub key: String,
    pub name: String,
    pub kind: FilterKind,
    pub postfix: Option<String>,
    pub measure: Option<String>,
    /// Values the filter offers; empty means free-form.
    pub allowed_values: Vec<String>,
}

/// In-memory catalog.
///
/// Rows are kept in id order, which is also insertion order for ids the
/// catalog assigns itself.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    categories: BTreeMap<CategoryId, Category>,
    features: BTreeMap<FeatureId, ProductFeature>,
    validators: BTreeMap<ValidatorId, ProductFeatureValidator>,
    products: BTreeMap<ProductId, Product>,
}

impl Catalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// All categories in id order.
    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.categories.values()
    }

    /// Look up a category by id.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::NotFound`] for an unknown id.
    pub fn category(&self, id: CategoryId) -> Result<&Category> {
        self.categories
            .get(&id)
            .ok_or_else(|| ShopError::not_found("category", id))
    }

    /// Look up a category by slug.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::NotFound`] for an unknown slug.
    pub fn category_by_slug(&self, slug: &str) -> Result<&Category> {
        self.categories
            .values()
            .find(|c| c.slug.as_str() == slug)
            .ok_or_else(|| ShopError::not_found("category", slug))
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::Validation`] for a bad name or slug and
    /// [`ShopError::Integrity`] if the slug is taken.
    pub fn add_category(&mut self, input: NewCategory) -> Result<Category> {
        let id = CategoryId::new(next_id(self.categories.keys().map(|k| k.as_i32())));
        let slug = Slug::parse(&input.slug).map_err(|e| ShopError::slug("slug", &e))?;
        self.insert_category(Category {
            id,
            name: input.name,
            slug,
        })
    }

    /// Insert a category keeping its id.
    ///
    /// # Errors
    ///
    /// Same as [`Catalog::add_category`], plus [`ShopError::Integrity`] if
    /// the id is taken.
    pub fn insert_category(&mut self, category: Category) -> Result<Category> {
        check_text("name", &category.name, MAX_NAME_LENGTH)?;
        if self.categories.contains_key(&category.id) {
            return Err(ShopError::integrity(format!(
                "category id {} already exists",
                category.id
            )));
        }
        self.ensure_category_slug_free(&category.slug, None)?;
        self.categories.insert(category.id, category.clone());
        Ok(category)
    }

    /// Rename a category or change its slug.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::NotFound`] for an unknown id, otherwise the
    /// errors of [`Catalog::add_category`].
    pub fn update_category(&mut self, id: CategoryId, input: NewCategory) -> Result<Category> {
        self.category(id)?;
        check_text("name", &input.name, MAX_NAME_LENGTH)?;
        let slug = Slug::parse(&input.slug).map_err(|e| ShopError::slug("slug", &e))?;
        self.ensure_category_slug_free(&slug, Some(id))?;

        let category = Category {
            id,
            name: input.name,
            slug,
        };
        self.categories.insert(id, category.clone());
        Ok(category)
    }

    fn ensure_category_slug_free(&self, slug: &Slug, except: Option<CategoryId>) -> Result<()> {
        let taken = self
            .categories
            .values()
            .any(|c| &c.slug == slug && Some(c.id) != except);
        if taken {
            return Err(ShopError::integrity(format!(
                "category slug '{slug}' already exists"
            )));
        }
        Ok(())
    }

    // =========================================================================
    // Features and validators
    // =========================================================================

    /// Features of a category in id order.
    pub fn features(&self, category_id: CategoryId) -> impl Iterator<Item = &ProductFeature> {
        self.features
            .values()
            .filter(move |f| f.category_id == category_id)
    }

    /// Look up a feature by id.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::NotFound`] for an unknown id.
    pub fn feature(&self, id: FeatureId) -> Result<&ProductFeature> {
        self.features
            .get(&id)
            .ok_or_else(|| ShopError::not_found("feature", id))
    }

    /// Define a feature for a category.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::NotFound`] for an unknown category,
    /// [`ShopError::Validation`] for bad text fields and
    /// [`ShopError::Integrity`] if the key already exists in the category.
    pub fn add_feature(&mut self, input: NewFeature) -> Result<ProductFeature> {
        let id = FeatureId::new(next_id(self.features.keys().map(|k| k.as_i32())));
        self.insert_feature(ProductFeature {
            id,
            category_id: input.category_id,
            key: input.key,
            name: input.name,
            postfix: input.postfix.filter(|p| !p.is_empty()),
            filter_measure: input.filter_measure.filter(|m| !m.is_empty()),
            use_in_filter: input.use_in_filter,
            filter_kind: input.filter_kind,
        })
    }

    /// Insert a feature keeping its id.
    ///
    /// # Errors
    ///
    /// Same as [`Catalog::add_feature`], plus [`ShopError::Integrity`] if the
    /// id is taken.
    pub fn insert_feature(&mut self, feature: ProductFeature) -> Result<ProductFeature> {
        let category = self.category(feature.category_id)?;
        check_text("key", &feature.key, MAX_KEY_LENGTH)?;
        check_text("name", &feature.name, MAX_NAME_LENGTH)?;
        if let Some(postfix) = &feature.postfix {
            check_len("postfix", postfix, MAX_POSTFIX_LENGTH)?;
        }
        if let Some(measure) = &feature.filter_measure {
            check_len("filter_measure", measure, MAX_MEASURE_LENGTH)?;
        }
        if self.features(category.id).any(|f| f.key == feature.key) {
            return Err(ShopError::integrity(format!(
                "feature key {:?} already exists in category '{}'",
                feature.key, category.slug
            )));
        }
        if self.features.contains_key(&feature.id) {
            return Err(ShopError::integrity(format!(
                "feature id {} already exists",
                feature.id
            )));
        }
        self.features.insert(feature.id, feature.clone());
        Ok(feature)
    }

    /// Register an allowed feature value.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::NotFound`] for an unknown category or feature,
    /// [`ShopError::Validation`] if the feature belongs to another category,
    /// and [`ShopError::Integrity`] if the value is already registered
    /// anywhere in the catalog.
    pub fn add_validator(&mut self, input: NewValidator) -> Result<ProductFeatureValidator> {
        let id = ValidatorId::new(next_id(self.validators.keys().map(|k| k.as_i32())));
        self.insert_validator(ProductFeatureValidator {
            id,
            category_id: input.category_id,
            feature_id: input.feature_id,
            value: input.value,
        })
    }

    /// Insert a validator keeping its id.
    ///
    /// # Errors
    ///
    /// Same as [`Catalog::add_validator`], plus [`ShopError::Integrity`] if
    /// the id is taken.
    pub fn insert_validator(
        &mut self,
        validator: ProductFeatureValidator,
    ) -> Result<ProductFeatureValidator> {
        self.category(validator.category_id)?;
        if let Some(feature_id) = validator.feature_id {
            let feature = self.feature(feature_id)?;
            if feature.category_id != validator.category_id {
                return Err(ShopError::validation(
                    "feature",
                    format!(
                        "feature {:?} does not belong to category {}",
                        feature.key, validator.category_id
                    ),
                ));
            }
        }
        check_text("value", &validator.value, MAX_VALUE_LENGTH)?;
        if self.validators.values().any(|v| v.value == validator.value) {
            return Err(ShopError::integrity(format!(
                "feature value {:?} already exists",
                validator.value
            )));
        }
        if self.validators.contains_key(&validator.id) {
            return Err(ShopError::integrity(format!(
                "validator id {} already exists",
                validator.id
            )));
        }
        self.validators.insert(validator.id, validator.clone());
        Ok(validator)
    }

    /// All validators in id order.
    pub fn validators(&self) -> impl Iterator<Item = &ProductFeatureValidator> {
        self.validators.values()
    }

    /// All features in id order.
    pub fn all_features(&self) -> impl Iterator<Item = &ProductFeature> {
        self.features.values()
    }

    /// Values registered for a feature, in id order.
    #[must_use]
    pub fn allowed_values(&self, feature_id: FeatureId) -> Vec<&str> {
        self.validators
            .values()
            .filter(|v| v.feature_id == Some(feature_id))
            .map(|v| v.value.as_str())
            .collect()
    }

    /// Features of a category that take part in filtering, in id order.
    ///
    /// A category without such features yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::NotFound`] for an unknown category.
    pub fn filterable_features(&self, category_id: CategoryId) -> Result<Vec<FilterableFeature>> {
        self.category(category_id)?;
        Ok(self
            .features(category_id)
            .filter(|f| f.use_in_filter)
            .map(|f| FilterableFeature {
                key: f.key.clone(),
                name: f.name.clone(),
                kind: f.filter_kind,
                postfix: f.postfix.clone(),
                measure: f.filter_measure.clone(),
                allowed_values: self
                    .allowed_values(f.id)
                    .into_iter()
                    .map(str::to_owned)
                    .collect(),
            })
            .collect())
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// All products in id order.
    pub fn products(&self) -> impl Iterator<Item = &Product> {
        self.products.values()
    }

    /// Products of one variant in id order.
    pub fn products_of_kind(&self, kind: ProductKind) -> impl Iterator<Item = &Product> {
        self.products
            .values()
            .filter(move |p| p.specs.kind() == kind)
    }

    /// Products of one category in id order.
    pub fn products_in_category(&self, category_id: CategoryId) -> impl Iterator<Item = &Product> {
        self.products
            .values()
            .filter(move |p| p.category_id == category_id)
    }

    /// Look up a product by id.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::NotFound`] for an unknown id.
    pub fn product(&self, id: ProductId) -> Result<&Product> {
        self.products
            .get(&id)
            .ok_or_else(|| ShopError::not_found("product", id))
    }

    /// Look up a product by slug.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::NotFound`] for an unknown slug.
    pub fn product_by_slug(&self, slug: &str) -> Result<&Product> {
        self.products
            .values()
            .find(|p| p.slug.as_str() == slug)
            .ok_or_else(|| ShopError::not_found("product", slug))
    }

    /// Validate a draft and add it as a new product.
    ///
    /// # Errors
    ///
    /// Returns the draft's [`ShopError::Validation`] errors,
    /// [`ShopError::NotFound`] for an unknown category and
    /// [`ShopError::Integrity`] if the slug is taken.
    pub fn add_product(&mut self, draft: NewProduct) -> Result<Product> {
        let id = ProductId::new(next_id(self.products.keys().map(|k| k.as_i32())));
        self.insert_product(draft.validate(id)?)
    }

    /// Insert a validated product keeping its id.
    ///
    /// # Errors
    ///
    /// Same as [`Catalog::add_product`], plus [`ShopError::Integrity`] if the
    /// id is taken.
    pub fn insert_product(&mut self, product: Product) -> Result<Product> {
        self.category(product.category_id)?;
        if self.products.values().any(|p| p.slug == product.slug) {
            return Err(ShopError::integrity(format!(
                "product slug '{}' already exists",
                product.slug
            )));
        }
        if self.products.contains_key(&product.id) {
            return Err(ShopError::integrity(format!(
                "product id {} already exists",
                product.id
            )));
        }
        self.products.insert(product.id, product.clone());
        Ok(product)
    }

    /// Products of a category matching filter selections.
    ///
    /// `selections` are `(feature key, value)` pairs; pairs sharing a key are
    /// alternatives, different keys must all match. An empty selection
    /// returns every product of the category.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::NotFound`] for an unknown category and
    /// [`ShopError::Validation`] when a key is not a filter of the category,
    /// a single-choice filter gets several values, or a value is not one of
    /// the feature's allowed values.
    pub fn filter_products(
        &self,
        category_id: CategoryId,
        selections: &[(String, String)],
    ) -> Result<Vec<&Product>> {
        let category = self.category(category_id)?;

        let mut wanted: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (key, value) in selections {
            let values = wanted.entry(key.as_str()).or_default();
            if !values.contains(&value.as_str()) {
                values.push(value.as_str());
            }
        }

        for (key, values) in &wanted {
            let feature = self
                .features(category_id)
                .find(|f| f.use_in_filter && f.key == *key)
                .ok_or_else(|| {
                    ShopError::validation(
                        "filter",
                        format!("{key:?} is not a filter of category '{}'", category.slug),
                    )
                })?;

            if !feature.filter_kind.allows_many() && values.len() > 1 {
                return Err(ShopError::validation(
                    "filter",
                    format!("{key:?} accepts a single value"),
                ));
            }

            let allowed = self.allowed_values(feature.id);
            if let Some(bad) = values
                .iter()
                .copied()
                .find(|v| !allowed.is_empty() && !allowed.contains(v))
            {
                return Err(ShopError::validation(
                    "filter",
                    format!("{bad:?} is not an allowed value of {key:?}"),
                ));
            }
        }

        Ok(self
            .products_in_category(category_id)
            .filter(|p| {
                wanted.iter().all(|(key, values)| {
                    p.attribute(key)
                        .is_some_and(|actual| values.contains(&actual.as_str()))
                })
            })
            .collect())
    }
}

fn next_id(existing: impl Iterator<Item = i32>) -> i32 {
    existing.max().unwrap_or(0) + 1
}
