//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness
//! GET  /health/ready                    - Readiness (database ping)
//!
//! # Catalog
//! GET  /api/categories                  - Category list (paginated)
//! POST /api/categories                  - Create category
//! GET  /api/categories/{id}             - Category detail
//! PUT  /api/categories/{id}             - Update category
//! GET  /api/categories/{slug}/filters   - Filterable features
//! GET  /api/categories/{slug}/products  - Products matching ?key=value filters
//! POST /api/features                    - Create feature
//! POST /api/validators                  - Create allowed feature value
//! GET  /api/smartphones                 - Smartphone list (paginated, ?search=)
//! GET  /api/smartphones/{id}            - Smartphone detail
//! GET  /api/notebooks                   - Notebook list (paginated, ?search=)
//! GET  /api/notebooks/{id}              - Notebook detail
//! POST /api/products                    - Create product
//! GET  /api/products/{slug}             - Product detail by slug
//!
//! # Customers
//! GET  /api/customers                   - Customers with orders (paginated)
//! POST /api/orders/{id}/advance         - Next order status
//!
//! # Cart (x-user-id or x-cart-id)
//! GET  /cart                            - Current cart
//! POST /cart/add                        - Add product
//! POST /cart/update                     - Set line quantity
//! POST /cart/remove                     - Remove line
//! POST /cart/clear                      - Remove every line
//!
//! # Checkout and account (x-user-id required)
//! POST /checkout                        - Place order
//! GET  /account                         - Profile
//! PUT  /account                         - Update profile
//! GET  /account/orders                  - Order history
//! ```

pub mod account;
pub mod api;
pub mod cart;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::show).put(account::update))
        .route("/orders", get(account::orders))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(api::router())
        .nest("/cart", cart_routes())
        .route("/checkout", post(cart::checkout))
        .nest("/account", account_routes())
}
