//! Catalog repository.
//!
//! Loads the whole catalog into a [`Catalog`] and writes catalog rows back.
//! Queries are runtime-checked (`sqlx::query_as` + `FromRow`) so the crate
//! builds without a live database or an offline query cache.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, instrument};

use gadget_shop_core::{
    Catalog, Category, CategoryId, FeatureId, FilterKind, NewProduct, Product,
    ProductFeature, ProductFeatureValidator, ProductId, ProductKind, ProductSpecs, Slug,
    ValidatorId,
};

use super::{RepositoryError, conflict_on_unique};

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: CategoryId,
    name: String,
    slug: String,
}

#[derive(sqlx::FromRow)]
struct FeatureRow {
    id: FeatureId,
    category_id: CategoryId,
    key: String,
    name: String,
    postfix: Option<String>,
    filter_measure: Option<String>,
    use_in_filter: bool,
    filter_kind: FilterKind,
}

#[derive(sqlx::FromRow)]
struct ValidatorRow {
    id: ValidatorId,
    category_id: CategoryId,
    feature_id: Option<FeatureId>,
    value: String,
}

/// A product joined with whichever variant table holds its specs.
#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    category_id: CategoryId,
    kind: String,
    title: String,
    slug: String,
    image: String,
    description: Option<String>,
    price: Decimal,
    diagonal: Option<String>,
    display: Option<String>,
    ram: Option<String>,
    resolution: Option<String>,
    battery_capacity: Option<String>,
    removable_storage: Option<bool>,
    removable_storage_max: Option<String>,
    main_camera_mp: Option<String>,
    front_camera_mp: Option<String>,
    processor_frequency: Option<String>,
    video_chipset: Option<String>,
    battery_life: Option<String>,
}

impl ProductRow {
    fn into_product(self) -> Result<Product, RepositoryError> {
        let kind: ProductKind = self.kind.parse().map_err(|_| {
            RepositoryError::DataCorruption(format!(
                "product {} has unknown kind {:?}",
                self.id, self.kind
            ))
        })?;
        let id = self.id;
        let draft = NewProduct {
            category_id: Some(self.category_id),
            title: Some(self.title),
            slug: Some(self.slug),
            image: Some(self.image),
            description: self.description,
            price: Some(self.price),
            kind: Some(kind),
            diagonal: self.diagonal,
            display: self.display,
            ram: self.ram,
            resolution: self.resolution,
            battery_capacity: self.battery_capacity,
            removable_storage: self.removable_storage,
            removable_storage_max: self.removable_storage_max,
            main_camera_mp: self.main_camera_mp,
            front_camera_mp: self.front_camera_mp,
            processor_frequency: self.processor_frequency,
            video_chipset: self.video_chipset,
            battery_life: self.battery_life,
        };
        draft.validate(id).map_err(|e| {
            RepositoryError::DataCorruption(format!("product {id} in database is invalid: {e}"))
        })
    }
}

/// Repository for catalog database operations.
pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    /// Create a new catalog repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Load every catalog row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails,
    /// `RepositoryError::DataCorruption` for rows that cannot be decoded and
    /// `RepositoryError::Shop` for rows that break catalog rules.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<Catalog, RepositoryError> {
        let mut catalog = Catalog::new();

        let categories: Vec<CategoryRow> =
            sqlx::query_as("SELECT id, name, slug FROM category ORDER BY id")
                .fetch_all(self.pool)
                .await?;
        for row in categories {
            let slug = Slug::parse(&row.slug).map_err(|e| {
                RepositoryError::DataCorruption(format!("category {} slug: {e}", row.id))
            })?;
            catalog.insert_category(Category {
                id: row.id,
                name: row.name,
                slug,
            })?;
        }

        let features: Vec<FeatureRow> = sqlx::query_as(
            r"
            SELECT id, category_id, key, name, postfix, filter_measure, use_in_filter, filter_kind
            FROM product_feature
            ORDER BY id
            ",
        )
        .fetch_all(self.pool)
        .await?;
        for row in features {
            catalog.insert_feature(ProductFeature {
                id: row.id,
                category_id: row.category_id,
                key: row.key,
                name: row.name,
                postfix: row.postfix,
                filter_measure: row.filter_measure,
                use_in_filter: row.use_in_filter,
                filter_kind: row.filter_kind,
            })?;
        }

        let validators: Vec<ValidatorRow> = sqlx::query_as(
            "SELECT id, category_id, feature_id, value FROM product_feature_validator ORDER BY id",
        )
        .fetch_all(self.pool)
        .await?;
        for row in validators {
            catalog.insert_validator(ProductFeatureValidator {
                id: row.id,
                category_id: row.category_id,
                feature_id: row.feature_id,
                value: row.value,
            })?;
        }

        let products: Vec<ProductRow> = sqlx::query_as(
            r"
            SELECT p.id, p.category_id, p.kind::text AS kind, p.title, p.slug, p.image,
                   p.description, p.price,
                   COALESCE(s.diagonal, n.diagonal) AS diagonal,
                   COALESCE(s.display, n.display) AS display,
                   COALESCE(s.ram, n.ram) AS ram,
                   s.resolution, s.battery_capacity, s.removable_storage,
                   s.removable_storage_max, s.main_camera_mp, s.front_camera_mp,
                   n.processor_frequency, n.video_chipset, n.battery_life
            FROM product p
            LEFT JOIN smartphone s ON s.product_id = p.id
            LEFT JOIN notebook n ON n.product_id = p.id
            ORDER BY p.id
            ",
        )
        .fetch_all(self.pool)
        .await?;
        for row in products {
            catalog.insert_product(row.into_product()?)?;
        }

        debug!(
            categories = catalog.categories().count(),
            products = catalog.products().count(),
            "Loaded catalog"
        );
        Ok(catalog)
    }

    /// Write every row of `catalog` in one transaction.
    ///
    /// Existing rows with the same id are overwritten.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` on a uniqueness violation and
    /// `RepositoryError::Database` for other database errors.
    #[instrument(skip(self, catalog))]
    pub async fn store(&self, catalog: &Catalog) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        for category in catalog.categories() {
            upsert_category(&mut tx, category).await?;
        }
        for feature in catalog.all_features() {
            upsert_feature(&mut tx, feature).await?;
        }
        for validator in catalog.validators() {
            upsert_validator(&mut tx, validator).await?;
        }
        for product in catalog.products() {
            upsert_product(&mut tx, product).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Insert or update a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn save_category(&self, category: &Category) -> Result<(), RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        upsert_category(&mut conn, category).await
    }

    /// Insert or update a feature.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the key is taken in the category.
    pub async fn save_feature(&self, feature: &ProductFeature) -> Result<(), RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        upsert_feature(&mut conn, feature).await
    }

    /// Insert or update a validator.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the value is taken.
    pub async fn save_validator(
        &self,
        validator: &ProductFeatureValidator,
    ) -> Result<(), RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        upsert_validator(&mut conn, validator).await
    }

    /// Insert or update a product with its variant row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn save_product(&self, product: &Product) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        upsert_product(&mut tx, product).await?;
        tx.commit().await?;
        Ok(())
    }
}

async fn upsert_category(
    conn: &mut PgConnection,
    category: &Category,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO category (id, name, slug)
        VALUES ($1, $2, $3)
        ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, slug = EXCLUDED.slug
        ",
    )
    .bind(category.id)
    .bind(&category.name)
    .bind(category.slug.as_str())
    .execute(&mut *conn)
    .await
    .map_err(conflict_on_unique)?;
    Ok(())
}

async fn upsert_feature(
    conn: &mut PgConnection,
    feature: &ProductFeature,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO product_feature
            (id, category_id, key, name, postfix, filter_measure, use_in_filter, filter_kind)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (id) DO UPDATE SET
            category_id = EXCLUDED.category_id,
            key = EXCLUDED.key,
            name = EXCLUDED.name,
            postfix = EXCLUDED.postfix,
            filter_measure = EXCLUDED.filter_measure,
            use_in_filter = EXCLUDED.use_in_filter,
            filter_kind = EXCLUDED.filter_kind
        ",
    )
    .bind(feature.id)
    .bind(feature.category_id)
    .bind(&feature.key)
    .bind(&feature.name)
    .bind(&feature.postfix)
    .bind(&feature.filter_measure)
    .bind(feature.use_in_filter)
    .bind(feature.filter_kind)
    .execute(&mut *conn)
    .await
    .map_err(conflict_on_unique)?;
    Ok(())
}

async fn upsert_validator(
    conn: &mut PgConnection,
    validator: &ProductFeatureValidator,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO product_feature_validator (id, category_id, feature_id, value)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (id) DO UPDATE SET
            category_id = EXCLUDED.category_id,
            feature_id = EXCLUDED.feature_id,
            value = EXCLUDED.value
        ",
    )
    .bind(validator.id)
    .bind(validator.category_id)
    .bind(validator.feature_id)
    .bind(&validator.value)
    .execute(&mut *conn)
    .await
    .map_err(conflict_on_unique)?;
    Ok(())
}

async fn upsert_product(conn: &mut PgConnection, product: &Product) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO product (id, category_id, kind, title, slug, image, description, price)
        VALUES ($1, $2, $3::product_kind, $4, $5, $6, $7, $8)
        ON CONFLICT (id) DO UPDATE SET
            category_id = EXCLUDED.category_id,
            title = EXCLUDED.title,
            slug = EXCLUDED.slug,
            image = EXCLUDED.image,
            description = EXCLUDED.description,
            price = EXCLUDED.price
        ",
    )
    .bind(product.id)
    .bind(product.category_id)
    .bind(product.variant_name())
    .bind(&product.title)
    .bind(product.slug.as_str())
    .bind(&product.image)
    .bind(&product.description)
    .bind(product.price)
    .execute(&mut *conn)
    .await
    .map_err(conflict_on_unique)?;

    match &product.specs {
        ProductSpecs::Smartphone(s) => {
            sqlx::query(
                r"
                INSERT INTO smartphone
                    (product_id, diagonal, display, resolution, battery_capacity, ram,
                     removable_storage, removable_storage_max, main_camera_mp, front_camera_mp)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ON CONFLICT (product_id) DO UPDATE SET
                    diagonal = EXCLUDED.diagonal,
                    display = EXCLUDED.display,
                    resolution = EXCLUDED.resolution,
                    battery_capacity = EXCLUDED.battery_capacity,
                    ram = EXCLUDED.ram,
                    removable_storage = EXCLUDED.removable_storage,
                    removable_storage_max = EXCLUDED.removable_storage_max,
                    main_camera_mp = EXCLUDED.main_camera_mp,
                    front_camera_mp = EXCLUDED.front_camera_mp
                ",
            )
            .bind(product.id)
            .bind(&s.diagonal)
            .bind(&s.display)
            .bind(&s.resolution)
            .bind(&s.battery_capacity)
            .bind(&s.ram)
            .bind(s.removable_storage)
            .bind(&s.removable_storage_max)
            .bind(&s.main_camera_mp)
            .bind(&s.front_camera_mp)
            .execute(&mut *conn)
            .await?;
        }
        ProductSpecs::Notebook(n) => {
            sqlx::query(
                r"
                INSERT INTO notebook
                    (product_id, diagonal, display, processor_frequency, ram, video_chipset,
                     battery_life)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (product_id) DO UPDATE SET
                    diagonal = EXCLUDED.diagonal,
                    display = EXCLUDED.display,
                    processor_frequency = EXCLUDED.processor_frequency,
                    ram = EXCLUDED.ram,
                    video_chipset = EXCLUDED.video_chipset,
                    battery_life = EXCLUDED.battery_life
                ",
            )
            .bind(product.id)
            .bind(&n.diagonal)
            .bind(&n.display)
            .bind(&n.processor_frequency)
            .bind(&n.ram)
            .bind(&n.video_chipset)
            .bind(&n.battery_life)
            .execute(&mut *conn)
            .await?;
        }
    }
    Ok(())
}
