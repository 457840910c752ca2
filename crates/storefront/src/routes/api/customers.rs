//! Customer and order administration handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::QueryRejection},
    routing::{get, post},
};
use serde::Serialize;
use tracing::instrument;

use gadget_shop_core::{Customer, CustomerId, Order, OrderId, UserId};

use super::pagination::{ListQuery, Page, paginate};
use crate::error::{Result, add_breadcrumb};
use crate::state::AppState;

/// Build the customer router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/customers", get(index))
        .route("/api/orders/{id}/advance", post(advance_order))
}

/// Customer with the orders it placed.
#[derive(Debug, Serialize)]
pub struct CustomerView {
    pub id: CustomerId,
    pub user_id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub orders: Vec<Order>,
}

impl CustomerView {
    fn new(customer: Customer, orders: Vec<Order>) -> Self {
        Self {
            id: customer.id,
            user_id: customer.user_id,
            first_name: customer.first_name,
            last_name: customer.last_name,
            phone: customer.phone,
            address: customer.address,
            orders,
        }
    }
}

/// List customers with their order history.
///
/// # Errors
///
/// Returns an error for a page outside the list.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    query: std::result::Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Page<CustomerView>>> {
    let Query(query) = query?;
    let customers = state
        .shop()
        .customers()
        .await
        .into_iter()
        .map(|(customer, orders)| CustomerView::new(customer, orders))
        .collect();
    let config = state.config();
    let page = paginate(
        customers,
        &query,
        &config.pagination,
        &config.base_url,
        "/api/customers",
    )?;
    Ok(Json(page))
}

/// Move an order to its next status.
///
/// # Errors
///
/// Returns `NotFound` for an unknown order and `Precondition` once it is
/// completed.
#[instrument(skip(state))]
pub async fn advance_order(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Order>> {
    let order = state.shop().advance_order(OrderId::new(id)).await?;
    add_breadcrumb(
        "order",
        "Order advanced",
        &[("order_id", id.to_string()), ("status", order.status.to_string())],
    );
    Ok(Json(order))
}
