//! Turning a cart into an order.

use chrono::{DateTime, Utc};

use crate::cart::Cart;
use crate::customer::Customer;
use crate::error::{Result, ShopError};
use crate::order::{Order, ShippingInfo};
use crate::types::{OrderId, OrderStatus};

/// Place an order for `customer` from `cart`.
///
/// On success the cart is frozen (`in_order`), adopted by the customer if it
/// was anonymous, and the order is appended to the customer's history. On
/// error neither the cart nor the customer is touched.
///
/// # Errors
///
/// - [`ShopError::Precondition`] if the cart is already checked out, is
///   empty, or belongs to another customer
/// - [`ShopError::Validation`] for invalid shipping details
pub fn place_order(
    id: OrderId,
    cart: &mut Cart,
    customer: &mut Customer,
    shipping: ShippingInfo,
    now: DateTime<Utc>,
) -> Result<Order> {
    cart.ensure_editable()?;
    if cart.is_empty() {
        return Err(ShopError::precondition(format!(
            "cart {} is empty",
            cart.id()
        )));
    }
    if let Some(owner) = cart.owner()
        && owner != customer.id
    {
        return Err(ShopError::precondition(format!(
            "cart {} belongs to customer {owner}",
            cart.id()
        )));
    }
    let requested_date = shipping.validate(now.date_naive())?;

    let order = Order {
        id,
        customer_id: customer.id,
        first_name: shipping.first_name,
        last_name: shipping.last_name,
        phone: shipping.phone,
        address: shipping.address,
        cart_id: Some(cart.id()),
        total_products: cart.total_products(),
        final_price: cart.final_price(),
        status: OrderStatus::New,
        buying_type: shipping.buying_type,
        comment: shipping.comment,
        created_at: now,
        requested_date,
    };

    cart.mark_in_order(customer.id);
    customer.record_order(order.id);
    Ok(order)
}
