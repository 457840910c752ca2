//! JSON API route handlers.
//!
//! Catalog browsing and administration, customers and orders.

pub mod categories;
pub mod customers;
pub mod pagination;
pub mod products;

use axum::Router;

use crate::state::AppState;

/// Build the complete API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(categories::router())
        .merge(products::router())
        .merge(customers::router())
}
