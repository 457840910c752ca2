//! Account route handlers (require a signed-in user).

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use tracing::instrument;

use gadget_shop_core::{Customer, CustomerProfile, Order};

use crate::error::Result;
use crate::middleware::auth::RequireUser;
use crate::state::AppState;

/// Show the customer profile.
///
/// # Errors
///
/// Returns a database error if a new customer cannot be stored.
#[instrument(skip(state), fields(user_id = %user_id))]
pub async fn show(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
) -> Result<Json<Customer>> {
    Ok(Json(state.shop().customer_for(user_id).await?))
}

/// Replace the customer profile.
///
/// # Errors
///
/// Returns `Validation` if a field is too long.
#[instrument(skip(state, body), fields(user_id = %user_id))]
pub async fn update(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    body: std::result::Result<Json<CustomerProfile>, JsonRejection>,
) -> Result<Json<Customer>> {
    let Json(profile) = body?;
    Ok(Json(state.shop().update_profile(user_id, profile).await?))
}

/// Order history, oldest first.
///
/// # Errors
///
/// Returns a database error if a new customer cannot be stored.
#[instrument(skip(state), fields(user_id = %user_id))]
pub async fn orders(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(state.shop().orders_for(user_id).await?))
}
