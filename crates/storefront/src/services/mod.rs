//! Business logic services for storefront.
//!
//! # Services
//!
//! - `shop` - Catalog administration, carts, customers and checkout

pub mod shop;

pub use shop::{GuestToken, ShopService, Shopper, ShopperCart};
