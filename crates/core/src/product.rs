//! Sellable products and their variant-specific attributes.
//!
//! A [`Product`] carries the attributes every item shares plus a
//! [`ProductSpecs`] payload holding the attributes of exactly one variant. The
//! variant is chosen when the product is built and never changes.
//!
//! Products enter the system as a [`NewProduct`] draft in which every field is
//! optional, so a caller that forgets a field gets a
//! [`ShopError::Validation`] naming it instead of a deserialization failure.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ShopError, check_text};
use crate::types::{CategoryId, Price, ProductId, Slug};

const MAX_TITLE_LENGTH: usize = 255;
const MAX_IMAGE_LENGTH: usize = 255;
const MAX_ATTRIBUTE_LENGTH: usize = 255;

/// Variant discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductKind {
    /// A phone.
    Smartphone,
    /// A laptop.
    Notebook,
}

impl ProductKind {
    /// Stable lowercase name used in URLs and serialized payloads.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Smartphone => "smartphone",
            Self::Notebook => "notebook",
        }
    }
}

impl std::fmt::Display for ProductKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProductKind {
    type Err = ShopError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "smartphone" => Ok(Self::Smartphone),
            "notebook" => Ok(Self::Notebook),
            _ => Err(ShopError::validation(
                "type",
                format!("unknown product type {s:?}"),
            )),
        }
    }
}

/// Smartphone attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartphoneSpecs {
    pub diagonal: String,
    pub display: String,
    pub resolution: String,
    pub battery_capacity: String,
    pub ram: String,
    /// Has a memory card slot.
    pub removable_storage: bool,
    /// Largest supported memory card.
    pub removable_storage_max: String,
    pub main_camera_mp: String,
    pub front_camera_mp: String,
}

/// Notebook attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotebookSpecs {
    pub diagonal: String,
    pub display: String,
    pub processor_frequency: String,
    pub ram: String,
    pub video_chipset: String,
    pub battery_life: String,
}

/// Variant payload.
///
/// Serialized with an inline `type` tag so the product's external form is a
/// single flat object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProductSpecs {
    Smartphone(SmartphoneSpecs),
    Notebook(NotebookSpecs),
}

impl ProductSpecs {
    /// The discriminator of this payload.
    #[must_use]
    pub const fn kind(&self) -> ProductKind {
        match self {
            Self::Smartphone(_) => ProductKind::Smartphone,
            Self::Notebook(_) => ProductKind::Notebook,
        }
    }

    /// Look up a variant attribute by its serialized field name.
    ///
    /// Booleans are rendered as `"true"` / `"false"` so they can be matched
    /// against filter selections.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<String> {
        match self {
            Self::Smartphone(s) => match key {
                "diagonal" => Some(s.diagonal.clone()),
                "display" => Some(s.display.clone()),
                "resolution" => Some(s.resolution.clone()),
                "battery_capacity" => Some(s.battery_capacity.clone()),
                "ram" => Some(s.ram.clone()),
                "removable_storage" => Some(s.removable_storage.to_string()),
                "removable_storage_max" => Some(s.removable_storage_max.clone()),
                "main_camera_mp" => Some(s.main_camera_mp.clone()),
                "front_camera_mp" => Some(s.front_camera_mp.clone()),
                _ => None,
            },
            Self::Notebook(n) => match key {
                "diagonal" => Some(n.diagonal.clone()),
                "display" => Some(n.display.clone()),
                "processor_frequency" => Some(n.processor_frequency.clone()),
                "ram" => Some(n.ram.clone()),
                "video_chipset" => Some(n.video_chipset.clone()),
                "battery_life" => Some(n.battery_life.clone()),
                _ => None,
            },
        }
    }
}

/// A sellable item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub category_id: CategoryId,
    pub title: String,
    pub slug: Slug,
    /// Image reference (path or URL), resolved by the presentation layer.
    pub image: String,
    pub description: Option<String>,
    pub price: Price,
    #[serde(flatten)]
    pub specs: ProductSpecs,
}

impl Product {
    /// Stable variant discriminator: `"smartphone"` or `"notebook"`.
    #[must_use]
    pub const fn variant_name(&self) -> &'static str {
        self.specs.kind().as_str()
    }

    /// The product's canonical URL path.
    #[must_use]
    pub fn url(&self) -> String {
        canonical_url(&self.slug)
    }

    /// Look up a named attribute: `price` or any variant field.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<String> {
        match key {
            "price" => Some(self.price.to_string()),
            _ => self.specs.attribute(key),
        }
    }
}

/// Canonical URL path of a product page.
#[must_use]
pub fn canonical_url(slug: &Slug) -> String {
    format!("/products/{slug}/")
}

/// Unvalidated product input.
///
/// Mirrors the flat external representation of [`Product`] with every field
/// optional. Attributes of both variants live side by side; the ones not
/// belonging to the chosen `type` must be left empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewProduct {
    pub category_id: Option<CategoryId>,
    pub title: Option<String>,
    pub slug: Option<String>,
    pub image: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    #[serde(rename = "type")]
    pub kind: Option<ProductKind>,

    pub diagonal: Option<String>,
    pub display: Option<String>,
    pub ram: Option<String>,

    pub resolution: Option<String>,
    pub battery_capacity: Option<String>,
    pub removable_storage: Option<bool>,
    pub removable_storage_max: Option<String>,
    pub main_camera_mp: Option<String>,
    pub front_camera_mp: Option<String>,

    pub processor_frequency: Option<String>,
    pub video_chipset: Option<String>,
    pub battery_life: Option<String>,
}

impl NewProduct {
    /// Validate the draft and build a product with the given id.
    ///
    /// Checks field presence and shape only; catalog-level rules (category
    /// exists, slug unique) are enforced by [`crate::Catalog::add_product`].
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::Validation`] naming the first missing or invalid
    /// field.
    pub fn validate(self, id: ProductId) -> Result<Product> {
        let category_id = self.category_id.ok_or_else(|| ShopError::missing("category"))?;

        let title = required("title", self.title)?;
        check_text("title", &title, MAX_TITLE_LENGTH)?;

        let slug = required("slug", self.slug)?;
        let slug = Slug::parse(&slug).map_err(|e| ShopError::slug("slug", &e))?;

        let image = required("image", self.image)?;
        check_text("image", &image, MAX_IMAGE_LENGTH)?;

        let price = self.price.ok_or_else(|| ShopError::missing("price"))?;
        let price = Price::new(price).map_err(|e| ShopError::price("price", &e))?;

        let description = self.description.filter(|d| !d.trim().is_empty());

        let kind = self.kind.ok_or_else(|| ShopError::missing("type"))?;
        let specs = match kind {
            ProductKind::Smartphone => {
                reject_foreign(
                    kind,
                    &[
                        ("processor_frequency", self.processor_frequency.is_some()),
                        ("video_chipset", self.video_chipset.is_some()),
                        ("battery_life", self.battery_life.is_some()),
                    ],
                )?;
                ProductSpecs::Smartphone(SmartphoneSpecs {
                    diagonal: spec_field("diagonal", self.diagonal)?,
                    display: spec_field("display", self.display)?,
                    resolution: spec_field("resolution", self.resolution)?,
                    battery_capacity: spec_field("battery_capacity", self.battery_capacity)?,
                    ram: spec_field("ram", self.ram)?,
                    removable_storage: self
                        .removable_storage
                        .ok_or_else(|| ShopError::missing("removable_storage"))?,
                    removable_storage_max: spec_field(
                        "removable_storage_max",
                        self.removable_storage_max,
                    )?,
                    main_camera_mp: spec_field("main_camera_mp", self.main_camera_mp)?,
                    front_camera_mp: spec_field("front_camera_mp", self.front_camera_mp)?,
                })
            }
            ProductKind::Notebook => {
                reject_foreign(
                    kind,
                    &[
                        ("resolution", self.resolution.is_some()),
                        ("battery_capacity", self.battery_capacity.is_some()),
                        ("removable_storage", self.removable_storage.is_some()),
                        ("removable_storage_max", self.removable_storage_max.is_some()),
                        ("main_camera_mp", self.main_camera_mp.is_some()),
                        ("front_camera_mp", self.front_camera_mp.is_some()),
                    ],
                )?;
                ProductSpecs::Notebook(NotebookSpecs {
                    diagonal: spec_field("diagonal", self.diagonal)?,
                    display: spec_field("display", self.display)?,
                    processor_frequency: spec_field(
                        "processor_frequency",
                        self.processor_frequency,
                    )?,
                    ram: spec_field("ram", self.ram)?,
                    video_chipset: spec_field("video_chipset", self.video_chipset)?,
                    battery_life: spec_field("battery_life", self.battery_life)?,
                })
            }
        };

        Ok(Product {
            id,
            category_id,
            title,
            slug,
            image,
            description,
            price,
            specs,
        })
    }
}

impl From<&Product> for NewProduct {
    fn from(product: &Product) -> Self {
        let mut draft = Self {
            category_id: Some(product.category_id),
            title: Some(product.title.clone()),
            slug: Some(product.slug.to_string()),
            image: Some(product.image.clone()),
            description: product.description.clone(),
            price: Some(product.price.amount()),
            kind: Some(product.specs.kind()),
            ..Self::default()
        };
        match &product.specs {
            ProductSpecs::Smartphone(s) => {
                draft.diagonal = Some(s.diagonal.clone());
                draft.display = Some(s.display.clone());
                draft.resolution = Some(s.resolution.clone());
                draft.battery_capacity = Some(s.battery_capacity.clone());
                draft.ram = Some(s.ram.clone());
                draft.removable_storage = Some(s.removable_storage);
                draft.removable_storage_max = Some(s.removable_storage_max.clone());
                draft.main_camera_mp = Some(s.main_camera_mp.clone());
                draft.front_camera_mp = Some(s.front_camera_mp.clone());
            }
            ProductSpecs::Notebook(n) => {
                draft.diagonal = Some(n.diagonal.clone());
                draft.display = Some(n.display.clone());
                draft.processor_frequency = Some(n.processor_frequency.clone());
                draft.ram = Some(n.ram.clone());
                draft.video_chipset = Some(n.video_chipset.clone());
                draft.battery_life = Some(n.battery_life.clone());
            }
        }
        draft
    }
}

fn required(field: &'static str, value: Option<String>) -> Result<String> {
    value.ok_or_else(|| ShopError::missing(field))
}

fn spec_field(field: &'static str, value: Option<String>) -> Result<String> {
    let value = required(field, value)?;
    check_text(field, &value, MAX_ATTRIBUTE_LENGTH)?;
    Ok(value)
}

fn reject_foreign(kind: ProductKind, fields: &[(&'static str, bool)]) -> Result<()> {
    match fields.iter().find(|(_, present)| *present) {
        Some(&(field, _)) => Err(ShopError::validation(
            field,
            format!("not an attribute of a {kind}"),
        )),
        None => Ok(()),
    }
}
