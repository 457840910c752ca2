//! Product API handlers.
//!
//! Smartphones and notebooks have their own list and detail endpoints;
//! `/api/products/{slug}` finds either variant.

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    routing::{get, post},
};
use serde::Serialize;
use tracing::instrument;

use gadget_shop_core::{NewProduct, Product, ProductId, ProductKind, ShopError};

use super::pagination::{ListQuery, Page, matches_search, paginate};
use crate::error::Result;
use crate::state::AppState;

/// Build the product router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/smartphones", get(smartphones))
        .route("/api/smartphones/{id}", get(smartphone))
        .route("/api/notebooks", get(notebooks))
        .route("/api/notebooks/{id}", get(notebook))
        .route("/api/products", post(create))
        .route("/api/products/{slug}", get(show))
}

/// Product as returned by the API: every stored field, the `type`
/// discriminator and the canonical URL.
#[derive(Debug, Serialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub url: String,
}

impl From<Product> for ProductView {
    fn from(product: Product) -> Self {
        let url = product.url();
        Self { product, url }
    }
}

/// Attributes searched besides price and title.
const fn search_field(kind: ProductKind) -> &'static str {
    match kind {
        ProductKind::Smartphone => "battery_capacity",
        ProductKind::Notebook => "video_chipset",
    }
}

async fn list(
    state: &AppState,
    kind: ProductKind,
    query: &ListQuery,
    path: &str,
) -> Result<Page<ProductView>> {
    let terms = query.search_terms();
    let products: Vec<ProductView> = state
        .shop()
        .catalog()
        .await
        .products_of_kind(kind)
        .filter(|p| {
            let price = p.price.to_string();
            let extra = p.attribute(search_field(kind)).unwrap_or_default();
            matches_search(&terms, &[&price, &p.title, &extra])
        })
        .cloned()
        .map(ProductView::from)
        .collect();

    let config = state.config();
    paginate(products, query, &config.pagination, &config.base_url, path)
}

async fn detail(state: &AppState, kind: ProductKind, id: i32) -> Result<ProductView> {
    let id = ProductId::new(id);
    let catalog = state.shop().catalog().await;
    let product = catalog
        .product(id)
        .ok()
        .filter(|p| p.specs.kind() == kind)
        .ok_or_else(|| ShopError::not_found(kind.as_str(), id))?;
    Ok(product.clone().into())
}

/// List smartphones, optionally searched.
///
/// # Errors
///
/// Returns an error for a page outside the list.
#[instrument(skip(state))]
pub async fn smartphones(
    State(state): State<AppState>,
    query: std::result::Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Page<ProductView>>> {
    let Query(query) = query?;
    let page = list(&state, ProductKind::Smartphone, &query, "/api/smartphones").await?;
    Ok(Json(page))
}

/// Show one smartphone.
///
/// # Errors
///
/// Returns `NotFound` unless `id` is a smartphone.
#[instrument(skip(state))]
pub async fn smartphone(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ProductView>> {
    Ok(Json(detail(&state, ProductKind::Smartphone, id).await?))
}

/// List notebooks, optionally searched.
///
/// # Errors
///
/// Returns an error for a page outside the list.
#[instrument(skip(state))]
pub async fn notebooks(
    State(state): State<AppState>,
    query: std::result::Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Page<ProductView>>> {
    let Query(query) = query?;
    let page = list(&state, ProductKind::Notebook, &query, "/api/notebooks").await?;
    Ok(Json(page))
}

/// Show one notebook.
///
/// # Errors
///
/// Returns `NotFound` unless `id` is a notebook.
#[instrument(skip(state))]
pub async fn notebook(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ProductView>> {
    Ok(Json(detail(&state, ProductKind::Notebook, id).await?))
}

/// Show any product by slug.
///
/// # Errors
///
/// Returns `NotFound` for an unknown slug.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ProductView>> {
    let product = state.shop().catalog().await.product_by_slug(&slug)?.clone();
    Ok(Json(product.into()))
}

/// Add a product.
///
/// # Errors
///
/// Returns `Validation` naming the first missing or bad field, `NotFound`
/// for an unknown category and `Integrity` for a taken slug.
pub async fn create(
    State(state): State<AppState>,
    body: std::result::Result<Json<NewProduct>, JsonRejection>,
) -> Result<(StatusCode, Json<ProductView>)> {
    let Json(draft) = body?;
    let product = state.shop().add_product(draft).await?;
    Ok((StatusCode::CREATED, Json(product.into())))
}
