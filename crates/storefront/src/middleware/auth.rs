//! Shopper identity extractors.
//!
//! Authentication happens upstream: the identity provider forwards the
//! signed-in user's id in `x-user-id`. Guests carry an opaque cart token in
//! `x-cart-id`, which the cart endpoints hand out on the first add.

use axum::{extract::FromRequestParts, http::request::Parts};

use gadget_shop_core::UserId;

use crate::error::AppError;
use crate::services::{GuestToken, Shopper};

/// Header carrying the authenticated user's id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Header carrying a guest's cart token.
pub const CART_ID_HEADER: &str = "x-cart-id";

/// Extractor that requires a signed-in user.
///
/// # Example
///
/// ```rust,ignore
/// async fn orders(RequireUser(user_id): RequireUser) -> impl IntoResponse {
///     format!("orders of {user_id}")
/// }
/// ```
pub struct RequireUser(pub UserId);

/// Extractor for the current shopper, signed in or not.
pub struct CurrentShopper(pub Shopper);

/// Extractor for an optional guest cart token.
pub struct GuestCart(pub Option<GuestToken>);

/// Parse an integer id header; `Ok(None)` if absent.
fn id_header(parts: &Parts, name: &str) -> Result<Option<i32>, AppError> {
    parts
        .headers
        .get(name)
        .map(|value| {
            value
                .to_str()
                .ok()
                .and_then(|v| v.trim().parse::<i32>().ok())
                .filter(|id| *id > 0)
                .ok_or_else(|| AppError::BadRequest(format!("header {name} must be a numeric id")))
        })
        .transpose()
}

/// Parse the guest cart token header; `Ok(None)` if absent.
fn token_header(parts: &Parts) -> Result<Option<GuestToken>, AppError> {
    parts
        .headers
        .get(CART_ID_HEADER)
        .map(|value| {
            value
                .to_str()
                .ok()
                .and_then(|v| v.trim().parse::<GuestToken>().ok())
                .ok_or_else(|| {
                    AppError::BadRequest(format!("header {CART_ID_HEADER} must be a cart token"))
                })
        })
        .transpose()
}

impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = id_header(parts, USER_ID_HEADER)?
            .ok_or_else(|| AppError::Unauthorized("sign in to continue".to_string()))?;
        Ok(Self(UserId::new(user_id)))
    }
}

impl<S> FromRequestParts<S> for CurrentShopper
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user_id) = id_header(parts, USER_ID_HEADER)? {
            return Ok(Self(Shopper::Registered(UserId::new(user_id))));
        }
        Ok(Self(Shopper::Guest(token_header(parts)?)))
    }
}

impl<S> FromRequestParts<S> for GuestCart
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(token_header(parts)?))
    }
}
