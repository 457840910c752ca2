//! Category, feature and validator API handlers.

use axum::{
    Json, Router,
    extract::{
        Path, Query, RawQuery, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    routing::{get, post},
};
use serde::Serialize;
use tracing::instrument;

use gadget_shop_core::{
    Category, CategoryId, FilterableFeature, NewCategory, NewFeature, NewValidator,
    ProductFeature, ProductFeatureValidator,
};

use super::pagination::{ListQuery, Page, paginate};
use super::products::ProductView;
use crate::error::Result;
use crate::state::AppState;

/// Build the category router.
///
/// The `{category}` segment is an id on the detail routes and a slug on the
/// filter routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/categories", get(index).post(create))
        .route("/api/categories/{category}", get(show).put(update))
        .route("/api/categories/{category}/filters", get(filters))
        .route("/api/categories/{category}/products", get(products))
        .route("/api/features", post(create_feature))
        .route("/api/validators", post(create_validator))
}

/// Category as returned by the API.
#[derive(Debug, Serialize)]
pub struct CategoryView {
    #[serde(flatten)]
    pub category: Category,
    pub url: String,
}

impl From<Category> for CategoryView {
    fn from(category: Category) -> Self {
        let url = category.url();
        Self { category, url }
    }
}

/// List categories.
///
/// # Errors
///
/// Returns an error for a page outside the list.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    query: std::result::Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Page<CategoryView>>> {
    let Query(query) = query?;
    let categories: Vec<CategoryView> = state
        .shop()
        .catalog()
        .await
        .categories()
        .cloned()
        .map(CategoryView::from)
        .collect();
    let config = state.config();
    let page = paginate(
        categories,
        &query,
        &config.pagination,
        &config.base_url,
        "/api/categories",
    )?;
    Ok(Json(page))
}

/// Show one category by id.
///
/// # Errors
///
/// Returns `NotFound` for an unknown id.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<CategoryView>> {
    let category = state.shop().catalog().await.category(CategoryId::new(id))?.clone();
    Ok(Json(category.into()))
}

/// Create a category.
///
/// # Errors
///
/// Returns `Validation` for a bad name or slug and `Integrity` for a taken
/// slug.
pub async fn create(
    State(state): State<AppState>,
    body: std::result::Result<Json<NewCategory>, JsonRejection>,
) -> Result<(StatusCode, Json<CategoryView>)> {
    let Json(input) = body?;
    let category = state.shop().add_category(input).await?;
    Ok((StatusCode::CREATED, Json(category.into())))
}

/// Update a category.
///
/// # Errors
///
/// Same as [`create`], plus `NotFound`.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    body: std::result::Result<Json<NewCategory>, JsonRejection>,
) -> Result<Json<CategoryView>> {
    let Json(input) = body?;
    let category = state
        .shop()
        .update_category(CategoryId::new(id), input)
        .await?;
    Ok(Json(category.into()))
}

/// Filterable features of a category, with their allowed values.
///
/// # Errors
///
/// Returns `NotFound` for an unknown slug.
#[instrument(skip(state))]
pub async fn filters(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Vec<FilterableFeature>>> {
    let catalog = state.shop().catalog().await;
    let category = catalog.category_by_slug(&slug)?;
    Ok(Json(catalog.filterable_features(category.id)?))
}

/// Products of a category narrowed by `?key=value` filter selections.
///
/// Keys may repeat to select several values of a multi-choice filter.
///
/// # Errors
///
/// Returns `NotFound` for an unknown slug and `Validation` for a selection
/// the category's filters reject.
#[instrument(skip(state))]
pub async fn products(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<Json<Vec<ProductView>>> {
    let selections: Vec<(String, String)> = query
        .as_deref()
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect()
        })
        .unwrap_or_default();

    let catalog = state.shop().catalog().await;
    let category = catalog.category_by_slug(&slug)?;
    let products = catalog
        .filter_products(category.id, &selections)?
        .into_iter()
        .cloned()
        .map(ProductView::from)
        .collect();
    Ok(Json(products))
}

/// Define a feature for a category.
///
/// # Errors
///
/// Returns `NotFound` for an unknown category, `Validation` for bad fields
/// and `Integrity` for a key already used in the category.
pub async fn create_feature(
    State(state): State<AppState>,
    body: std::result::Result<Json<NewFeature>, JsonRejection>,
) -> Result<(StatusCode, Json<ProductFeature>)> {
    let Json(input) = body?;
    let feature = state.shop().add_feature(input).await?;
    Ok((StatusCode::CREATED, Json(feature)))
}

/// Register an allowed feature value.
///
/// # Errors
///
/// Returns `NotFound` for an unknown category or feature and `Integrity`
/// for a value already registered.
pub async fn create_validator(
    State(state): State<AppState>,
    body: std::result::Result<Json<NewValidator>, JsonRejection>,
) -> Result<(StatusCode, Json<ProductFeatureValidator>)> {
    let Json(input) = body?;
    let validator = state.shop().add_validator(input).await?;
    Ok((StatusCode::CREATED, Json(validator)))
}
