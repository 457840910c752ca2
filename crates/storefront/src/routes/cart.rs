//! Cart and checkout route handlers.
//!
//! Signed-in shoppers always have a cart. Guests get an anonymous cart on
//! their first add; an opaque token for it comes back in the `x-cart-id`
//! response header and must be sent with later cart requests.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{AppendHeaders, IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use gadget_shop_core::{
    Cart, CartId, CartLine, CartLineId, CustomerId, Order, Price, ProductId, ShippingInfo,
};

use crate::error::{Result, add_breadcrumb};
use crate::middleware::auth::{CART_ID_HEADER, CurrentShopper, GuestCart, RequireUser};
use crate::services::{Shopper, ShopperCart};
use crate::state::AppState;

/// Cart as returned by the API.
#[derive(Debug, Serialize)]
pub struct CartView {
    /// `None` until a guest adds the first product.
    pub id: Option<CartId>,
    pub owner: Option<CustomerId>,
    pub lines: Vec<CartLine>,
    pub total_products: u32,
    pub final_price: Price,
    pub in_order: bool,
    pub for_anonymous_user: bool,
}

impl CartView {
    /// The cart of a guest who has not added anything yet.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            id: None,
            owner: None,
            lines: Vec::new(),
            total_products: 0,
            final_price: Price::ZERO,
            in_order: false,
            for_anonymous_user: true,
        }
    }
}

impl From<Cart> for CartView {
    fn from(cart: Cart) -> Self {
        Self {
            id: Some(cart.id()),
            owner: cart.owner(),
            lines: cart.lines().to_vec(),
            total_products: cart.total_products(),
            final_price: cart.final_price(),
            in_order: cart.in_order(),
            for_anonymous_user: cart.for_anonymous_user(),
        }
    }
}

/// Respond with the cart, echoing the guest token for guest carts.
fn cart_response(ShopperCart { cart, guest_token }: ShopperCart) -> Response {
    let view = CartView::from(cart);
    match guest_token {
        Some(token) => (
            AppendHeaders([(CART_ID_HEADER, token.to_string())]),
            Json(view),
        )
            .into_response(),
        None => Json(view).into_response(),
    }
}

/// Add-to-cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

const fn default_quantity() -> u32 {
    1
}

/// Update-quantity form data.
#[derive(Debug, Deserialize)]
pub struct UpdateLineRequest {
    pub line_id: CartLineId,
    pub quantity: u32,
}

/// Remove-line form data.
#[derive(Debug, Deserialize)]
pub struct RemoveLineRequest {
    pub line_id: CartLineId,
}

/// Show the current cart.
///
/// # Errors
///
/// Returns `NotFound` for an unknown guest token.
#[instrument(skip(state, shopper))]
pub async fn show(
    State(state): State<AppState>,
    CurrentShopper(shopper): CurrentShopper,
) -> Result<Response> {
    Ok(match state.shop().cart(shopper).await? {
        Some(cart) => cart_response(cart),
        None => Json(CartView::empty()).into_response(),
    })
}

/// Add a product to the cart, or raise the quantity of its line.
///
/// # Errors
///
/// Returns `NotFound` for an unknown product or guest cart, `Validation` for
/// a zero quantity and `Precondition` for a checked-out cart.
#[instrument(skip(state, shopper, body))]
pub async fn add(
    State(state): State<AppState>,
    CurrentShopper(shopper): CurrentShopper,
    body: std::result::Result<Json<AddToCartRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) = body?;
    let (cart, line) = state
        .shop()
        .add_to_cart(shopper, request.product_id, request.quantity)
        .await?;
    add_breadcrumb(
        "cart",
        "Added to cart",
        &[
            ("cart_id", cart.cart.id().to_string()),
            ("product_id", line.product_id.to_string()),
            ("quantity", line.quantity.to_string()),
        ],
    );
    Ok(cart_response(cart))
}

/// Set a line's quantity; zero removes the line.
///
/// # Errors
///
/// Returns `NotFound` for an unknown cart or line and `Precondition` for a
/// checked-out cart.
#[instrument(skip(state, shopper, body))]
pub async fn update(
    State(state): State<AppState>,
    CurrentShopper(shopper): CurrentShopper,
    body: std::result::Result<Json<UpdateLineRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) = body?;
    let cart = state
        .shop()
        .update_line(shopper, request.line_id, request.quantity)
        .await?;
    add_breadcrumb(
        "cart",
        "Updated cart line",
        &[
            ("line_id", request.line_id.to_string()),
            ("quantity", request.quantity.to_string()),
        ],
    );
    Ok(cart_response(cart))
}

/// Remove a line.
///
/// # Errors
///
/// Same as [`update`].
#[instrument(skip(state, shopper, body))]
pub async fn remove(
    State(state): State<AppState>,
    CurrentShopper(shopper): CurrentShopper,
    body: std::result::Result<Json<RemoveLineRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) = body?;
    let cart = state.shop().remove_line(shopper, request.line_id).await?;
    add_breadcrumb(
        "cart",
        "Removed cart line",
        &[("line_id", request.line_id.to_string())],
    );
    Ok(cart_response(cart))
}

/// Remove every line.
///
/// # Errors
///
/// Returns `NotFound` for a guest without a cart and `Precondition` for a
/// checked-out cart.
#[instrument(skip(state, shopper))]
pub async fn clear(
    State(state): State<AppState>,
    CurrentShopper(shopper): CurrentShopper,
) -> Result<Response> {
    let cart = state.shop().clear_cart(shopper).await?;
    add_breadcrumb("cart", "Cleared cart", &[("cart_id", cart.cart.id().to_string())]);
    Ok(cart_response(cart))
}

/// Place an order from the cart.
///
/// Checks out the guest cart behind the `x-cart-id` token if present, otherwise the
/// signed-in customer's own cart.
///
/// # Errors
///
/// Returns `Unauthorized` without a principal, `Validation` for bad shipping
/// data and `Precondition` for an empty, foreign or checked-out cart.
#[instrument(skip(state, body), fields(user_id = %user_id))]
pub async fn checkout(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    GuestCart(guest_cart): GuestCart,
    body: std::result::Result<Json<ShippingInfo>, JsonRejection>,
) -> Result<(StatusCode, Json<Order>)> {
    let Json(shipping) = body?;
    let order = state.shop().checkout(user_id, guest_cart, shipping).await?;
    add_breadcrumb(
        "checkout",
        "Order placed",
        &[
            ("order_id", order.id.to_string()),
            ("final_price", order.final_price.to_string()),
        ],
    );
    Ok((StatusCode::CREATED, Json(order)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::GuestToken;

    #[test]
    fn test_add_request_defaults_to_one() {
        let request: AddToCartRequest = serde_json::from_str(r#"{"product_id": 3}"#).unwrap();
        assert_eq!(request.product_id, ProductId::new(3));
        assert_eq!(request.quantity, 1);
    }

    #[test]
    fn test_negative_quantity_is_rejected() {
        assert!(
            serde_json::from_str::<UpdateLineRequest>(r#"{"line_id": 1, "quantity": -2}"#)
                .is_err()
        );
    }

    #[test]
    fn test_empty_view() {
        let json = serde_json::to_value(CartView::empty()).unwrap();
        assert!(json["id"].is_null());
        assert_eq!(json["final_price"], "0.00");
        assert_eq!(json["lines"], serde_json::json!([]));
    }

    #[test]
    fn test_guest_cart_echoes_token_header() {
        let token = GuestToken::generate();
        let response = cart_response(ShopperCart {
            cart: Cart::new(CartId::new(5), None),
            guest_token: Some(token),
        });
        assert_eq!(response.headers()[CART_ID_HEADER], token.to_string().as_str());

        let owned = cart_response(ShopperCart {
            cart: Cart::new(CartId::new(6), Some(CustomerId::new(1))),
            guest_token: None,
        });
        assert!(owned.headers().get(CART_ID_HEADER).is_none());
    }
}
