//! Customer accounts.

use serde::{Deserialize, Serialize};

use crate::error::{Result, check_len};
use crate::types::{CustomerId, OrderId, UserId};

const MAX_NAME_LENGTH: usize = 150;
const MAX_PHONE_LENGTH: usize = 16;
const MAX_ADDRESS_LENGTH: usize = 255;

/// A shopper with an account.
///
/// Wraps one user identity and keeps the ids of the customer's orders in the
/// order they were placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub user_id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    orders: Vec<OrderId>,
}

/// Profile fields a customer can set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CustomerProfile {
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl Customer {
    /// A customer with an empty profile and no orders.
    #[must_use]
    pub const fn new(id: CustomerId, user_id: UserId) -> Self {
        Self {
            id,
            user_id,
            first_name: String::new(),
            last_name: String::new(),
            phone: None,
            address: None,
            orders: Vec::new(),
        }
    }

    /// Attach a stored order history, oldest first.
    #[must_use]
    pub fn with_orders(mut self, orders: Vec<OrderId>) -> Self {
        self.orders = orders;
        self
    }

    /// Replace the profile fields.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ShopError::Validation`] if a field is too long.
    pub fn update_profile(&mut self, profile: CustomerProfile) -> Result<()> {
        check_len("first_name", &profile.first_name, MAX_NAME_LENGTH)?;
        check_len("last_name", &profile.last_name, MAX_NAME_LENGTH)?;
        if let Some(phone) = &profile.phone {
            check_len("phone", phone, MAX_PHONE_LENGTH)?;
        }
        if let Some(address) = &profile.address {
            check_len("address", address, MAX_ADDRESS_LENGTH)?;
        }

        self.first_name = profile.first_name;
        self.last_name = profile.last_name;
        self.phone = profile.phone;
        self.address = profile.address;
        Ok(())
    }

    /// Order history, oldest first.
    #[must_use]
    pub fn orders(&self) -> &[OrderId] {
        &self.orders
    }

    pub(crate) fn record_order(&mut self, order: OrderId) {
        self.orders.push(order);
    }
}
