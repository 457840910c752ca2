//! Gadget Shop Core - catalog, cart pricing and checkout.
//!
//! This crate holds the domain model shared by every Gadget Shop component:
//! - `storefront` - JSON API serving the catalog, carts and checkout
//! - `cli` - Command-line tools for migrations and catalog seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure operations - no I/O, no
//! database access, no HTTP. Callers own the storage and the locking; every
//! operation here takes `&mut` to the entities it changes and either applies
//! the whole change or returns a [`ShopError`] leaving them untouched.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, slugs and statuses
//! - [`catalog`] - Categories, product features and filtering
//! - [`product`] - Products and their variant specs
//! - [`cart`] - Carts, line items and the pricing engine
//! - [`customer`], [`order`], [`checkout`] - Accounts and order placement

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod customer;
pub mod error;
pub mod order;
pub mod product;
pub mod types;

pub use cart::{Cart, CartLine, StoredCart};
pub use catalog::*;
pub use checkout::place_order;
pub use customer::{Customer, CustomerProfile};
pub use error::{Result, ShopError};
pub use order::{Order, ShippingInfo};
pub use product::*;
pub use types::*;
