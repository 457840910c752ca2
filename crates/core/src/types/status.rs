//! Status and choice enums shared by the catalog and checkout.

use serde::{Deserialize, Serialize};

/// Order fulfillment status.
///
/// Orders move through the statuses in declaration order and never go back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Just placed, nobody has looked at it yet.
    #[default]
    New,
    /// Being assembled.
    InProgress,
    /// Ready for pickup or handed to delivery.
    Ready,
    /// Received by the customer.
    Completed,
}

impl OrderStatus {
    /// The status that follows this one, if any.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::New => Some(Self::InProgress),
            Self::InProgress => Some(Self::Ready),
            Self::Ready => Some(Self::Completed),
            Self::Completed => None,
        }
    }

    /// Stable wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::InProgress => "in_progress",
            Self::Ready => "ready",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "in_progress" => Ok(Self::InProgress),
            "ready" => Ok(Self::Ready),
            "completed" => Ok(Self::Completed),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

/// How the customer receives the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "buying_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum BuyingType {
    /// Customer collects the order from the shop.
    #[default]
    Pickup,
    /// Order is shipped to the customer's address.
    Delivery,
}

impl std::fmt::Display for BuyingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pickup => write!(f, "pickup"),
            Self::Delivery => write!(f, "delivery"),
        }
    }
}

/// Filter widget a product feature is rendered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "filter_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    /// Single choice.
    Radio,
    /// Any number of choices.
    #[default]
    Checkbox,
}

impl FilterKind {
    /// Whether more than one value may be selected at once.
    #[must_use]
    pub const fn allows_many(self) -> bool {
        matches!(self, Self::Checkbox)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_is_linear() {
        let mut status = OrderStatus::default();
        let mut seen = vec![status];
        while let Some(next) = status.next() {
            assert!(next > status);
            seen.push(next);
            status = next;
        }
        assert_eq!(
            seen,
            [
                OrderStatus::New,
                OrderStatus::InProgress,
                OrderStatus::Ready,
                OrderStatus::Completed
            ]
        );
    }

    #[test]
    fn test_order_status_round_trips_through_str() {
        for status in [
            OrderStatus::New,
            OrderStatus::InProgress,
            OrderStatus::Ready,
            OrderStatus::Completed,
        ] {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{status}\""));
        }
        assert!("is_ready".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_defaults() {
        assert_eq!(BuyingType::default(), BuyingType::Pickup);
        assert_eq!(FilterKind::default(), FilterKind::Checkbox);
        assert!(FilterKind::Checkbox.allows_many());
        assert!(!FilterKind::Radio.allows_many());
    }
}
