//! Orders and the shipping details captured at checkout.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ShopError, check_len, check_text};
use crate::types::{BuyingType, CartId, CustomerId, OrderId, OrderStatus, Price};

const MAX_FIRST_NAME_LENGTH: usize = 20;
const MAX_LAST_NAME_LENGTH: usize = 30;
const MAX_PHONE_LENGTH: usize = 11;
const MAX_ADDRESS_LENGTH: usize = 1024;

/// Shipping details submitted with a checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShippingInfo {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: Option<String>,
    pub buying_type: BuyingType,
    pub comment: Option<String>,
    /// Requested fulfilment date; today when absent.
    pub requested_date: Option<NaiveDate>,
}

impl ShippingInfo {
    /// Check field limits and resolve the requested date.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::Validation`] for a missing or over-long field, a
    /// delivery without an address, or a requested date before `today`.
    pub fn validate(&self, today: NaiveDate) -> Result<NaiveDate> {
        check_text("first_name", &self.first_name, MAX_FIRST_NAME_LENGTH)?;
        check_text("last_name", &self.last_name, MAX_LAST_NAME_LENGTH)?;
        check_text("phone", &self.phone, MAX_PHONE_LENGTH)?;

        match self.address.as_deref() {
            Some(address) => check_len("address", address, MAX_ADDRESS_LENGTH)?,
            None if self.buying_type == BuyingType::Delivery => {
                return Err(ShopError::validation(
                    "address",
                    "an address is required for delivery",
                ));
            }
            None => {}
        }

        let date = self.requested_date.unwrap_or(today);
        if date < today {
            return Err(ShopError::validation(
                "requested_date",
                format!("{date} is in the past"),
            ));
        }
        Ok(date)
    }
}

/// A placed order.
///
/// Shipping details and cart totals are copied in at checkout and do not
/// follow later changes to the customer or the products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: Option<String>,
    pub cart_id: Option<CartId>,
    pub total_products: u32,
    #[serde(deserialize_with = "Price::deserialize_total")]
    pub final_price: Price,
    pub status: OrderStatus,
    pub buying_type: BuyingType,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub requested_date: NaiveDate,
}

impl Order {
    /// Move to the next status.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::Precondition`] if the order is already completed.
    pub fn advance(&mut self) -> Result<OrderStatus> {
        let next = self.status.next().ok_or_else(|| {
            ShopError::precondition(format!("order {} is already {}", self.id, self.status))
        })?;
        self.status = next;
        Ok(next)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn shipping() -> ShippingInfo {
        ShippingInfo {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            phone: "79990001122".to_string(),
            ..ShippingInfo::default()
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()
    }

    #[test]
    fn test_requested_date_defaults_to_today() {
        assert_eq!(shipping().validate(today()).unwrap(), today());

        let later = today().succ_opt().unwrap();
        let info = ShippingInfo {
            requested_date: Some(later),
            ..shipping()
        };
        assert_eq!(info.validate(today()).unwrap(), later);
    }

    #[test]
    fn test_rejects_past_date() {
        let info = ShippingInfo {
            requested_date: today().pred_opt(),
            ..shipping()
        };
        assert!(matches!(
            info.validate(today()),
            Err(ShopError::Validation { field: "requested_date", .. })
        ));
    }

    #[test]
    fn test_field_limits() {
        let cases = [
            ("first_name", ShippingInfo { first_name: "a".repeat(21), ..shipping() }),
            ("last_name", ShippingInfo { last_name: "b".repeat(31), ..shipping() }),
            ("phone", ShippingInfo { phone: "1".repeat(12), ..shipping() }),
            ("phone", ShippingInfo { phone: String::new(), ..shipping() }),
            ("address", ShippingInfo { address: Some("c".repeat(1025)), ..shipping() }),
        ];
        for (expected, info) in cases {
            match info.validate(today()) {
                Err(ShopError::Validation { field, .. }) => assert_eq!(field, expected),
                other => panic!("expected validation error on {expected}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_delivery_needs_address() {
        let info = ShippingInfo {
            buying_type: BuyingType::Delivery,
            ..shipping()
        };
        assert!(info.validate(today()).is_err());

        let info = ShippingInfo {
            address: Some("221B Baker Street".to_string()),
            ..info
        };
        assert!(info.validate(today()).is_ok());
    }

    #[test]
    fn test_deserialize_defaults() {
        let info: ShippingInfo = serde_json::from_str(
            r#"{"first_name": "Ada", "last_name": "Lovelace", "phone": "79990001122"}"#,
        )
        .unwrap();
        assert_eq!(info.buying_type, BuyingType::Pickup);
        assert_eq!(info.requested_date, None);
        assert_eq!(info.comment, None);
    }

    #[test]
    fn test_large_order_round_trips() {
        let order = Order {
            id: OrderId::new(1),
            customer_id: CustomerId::new(1),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            phone: "79990001122".to_string(),
            address: None,
            cart_id: Some(CartId::new(1)),
            total_products: 20,
            final_price: Price::parse("9999999.99")
                .unwrap()
                .times(20)
                .unwrap(),
            status: OrderStatus::New,
            buying_type: BuyingType::Pickup,
            comment: None,
            created_at: "2024-05-17T10:00:00Z".parse().unwrap(),
            requested_date: today(),
        };
        assert_eq!(order.final_price.to_string(), "199999999.80");

        let json = serde_json::to_string(&order).unwrap();
        let back: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(back, order);
    }
}
