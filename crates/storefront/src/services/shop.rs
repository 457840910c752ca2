//! Shop service: catalog administration, carts, customers and orders.
//!
//! The catalog is a read model behind an `RwLock`, optionally backed by
//! `PostgreSQL`: writes are validated against a copy, persisted, and only then
//! swapped in. Customers, carts and orders follow the same pattern through
//! [`AccountRepository`] when a pool is configured.
//!
//! # Locking
//!
//! Every cart sits behind its own `Mutex`; a cart operation holds it for the
//! whole mutation so line and aggregate updates are never observed apart.
//! Locks are always taken in the order cart registry → cart → customers →
//! orders. The registry guard is released before any cart is locked.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::{Mutex, RwLock, RwLockReadGuard};
use tracing::{info, instrument};
use uuid::Uuid;

use gadget_shop_core::{
    Cart, CartId, CartLine, CartLineId, Catalog, Category, CategoryId, Customer, CustomerId,
    CustomerProfile, NewCategory, NewFeature, NewProduct, NewValidator, Order, OrderId, Product, ProductFeature,
    ProductFeatureValidator, ProductId, ShippingInfo, ShopError, UserId, place_order,
};

use crate::db::{AccountRepository, CatalogRepository, StoredAccounts};
use crate::error::Result;

/// Unguessable handle a guest uses to reach their cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GuestToken(Uuid);

impl GuestToken {
    /// A fresh random token.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub const fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for GuestToken {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for GuestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

impl FromStr for GuestToken {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Who is shopping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shopper {
    /// Signed-in user; the customer and cart are created on demand.
    Registered(UserId),
    /// Visitor without an account, with the token from a previous add.
    Guest(Option<GuestToken>),
}

/// A cart snapshot and, for guest carts, the token that reaches it.
#[derive(Debug, Clone)]
pub struct ShopperCart {
    pub cart: Cart,
    pub guest_token: Option<GuestToken>,
}

type CartHandle = Arc<Mutex<Cart>>;

struct CartEntry {
    handle: CartHandle,
    guest_token: Option<GuestToken>,
}

#[derive(Default)]
struct Carts {
    by_id: HashMap<CartId, CartEntry>,
    /// Open cart of each customer.
    active: HashMap<CustomerId, CartId>,
    guests: HashMap<GuestToken, CartId>,
}

impl Carts {
    fn active_handle(&self, customer_id: CustomerId) -> Option<&CartHandle> {
        self.active
            .get(&customer_id)
            .and_then(|id| self.by_id.get(id))
            .map(|entry| &entry.handle)
    }
}

struct ResolvedCart {
    handle: CartHandle,
    added_by: Option<CustomerId>,
    guest_token: Option<GuestToken>,
}

impl ResolvedCart {
    fn registered(handle: &CartHandle, customer_id: CustomerId) -> Self {
        Self {
            handle: Arc::clone(handle),
            added_by: Some(customer_id),
            guest_token: None,
        }
    }

    fn snapshot(&self, cart: &Cart) -> ShopperCart {
        ShopperCart {
            cart: cart.clone(),
            guest_token: self.guest_token,
        }
    }
}

#[derive(Default)]
struct Customers {
    by_id: BTreeMap<CustomerId, Customer>,
    by_user: HashMap<UserId, CustomerId>,
}

/// Shared shop state.
pub struct ShopService {
    catalog: RwLock<Catalog>,
    pool: Option<PgPool>,
    carts: RwLock<Carts>,
    customers: RwLock<Customers>,
    orders: RwLock<BTreeMap<OrderId, Order>>,
    next_cart_id: AtomicI32,
    next_customer_id: AtomicI32,
    next_order_id: AtomicI32,
}

fn next_id(ids: impl Iterator<Item = i32>) -> AtomicI32 {
    AtomicI32::new(ids.max().map_or(1, |max| max.saturating_add(1)))
}

impl ShopService {
    /// Create a service over a catalog with no shoppers yet, persisting
    /// writes to `pool` when one is given.
    #[must_use]
    pub fn new(catalog: Catalog, pool: Option<PgPool>) -> Self {
        Self::restore(catalog, pool, StoredAccounts::default())
    }

    /// Create a service from previously stored customers, carts and orders.
    ///
    /// Each customer's newest editable cart becomes their open cart.
    #[must_use]
    pub fn restore(catalog: Catalog, pool: Option<PgPool>, accounts: StoredAccounts) -> Self {
        let StoredAccounts {
            customers: stored_customers,
            carts: mut stored_carts,
            orders: stored_orders,
        } = accounts;

        let next_customer_id = next_id(stored_customers.iter().map(|c| c.id.as_i32()));
        let next_cart_id = next_id(stored_carts.iter().map(|(c, _)| c.id().as_i32()));
        let next_order_id = next_id(stored_orders.iter().map(|o| o.id.as_i32()));

        let mut customers = Customers::default();
        for customer in stored_customers {
            customers.by_user.insert(customer.user_id, customer.id);
            customers.by_id.insert(customer.id, customer);
        }

        stored_carts.sort_by_key(|(cart, _)| cart.id());
        let mut carts = Carts::default();
        for (cart, token) in stored_carts {
            let id = cart.id();
            let guest_token = token.map(GuestToken::from);
            if let Some(owner) = cart.owner()
                && !cart.in_order()
                && !cart.for_anonymous_user()
            {
                carts.active.insert(owner, id);
            }
            if let Some(token) = guest_token {
                carts.guests.insert(token, id);
            }
            carts.by_id.insert(
                id,
                CartEntry {
                    handle: Arc::new(Mutex::new(cart)),
                    guest_token,
                },
            );
        }

        let orders = stored_orders.into_iter().map(|o| (o.id, o)).collect();

        Self {
            catalog: RwLock::new(catalog),
            pool,
            carts: RwLock::new(carts),
            customers: RwLock::new(customers),
            orders: RwLock::new(orders),
            next_cart_id,
            next_customer_id,
            next_order_id,
        }
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Read access to the catalog.
    pub async fn catalog(&self) -> RwLockReadGuard<'_, Catalog> {
        self.catalog.read().await
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns the catalog's validation and integrity errors, or a database
    /// error if persisting fails.
    #[instrument(skip(self, input), fields(slug = %input.slug))]
    pub async fn add_category(&self, input: NewCategory) -> Result<Category> {
        let mut catalog = self.catalog.write().await;
        let mut next = catalog.clone();
        let category = next.add_category(input)?;
        if let Some(repo) = self.repository() {
            repo.save_category(&category).await?;
        }
        *catalog = next;
        info!(category_id = %category.id, "Category created");
        Ok(category)
    }

    /// Rename a category or change its slug.
    ///
    /// # Errors
    ///
    /// Same as [`ShopService::add_category`], plus `NotFound`.
    #[instrument(skip(self, input), fields(slug = %input.slug))]
    pub async fn update_category(&self, id: CategoryId, input: NewCategory) -> Result<Category> {
        let mut catalog = self.catalog.write().await;
        let mut next = catalog.clone();
        let category = next.update_category(id, input)?;
        if let Some(repo) = self.repository() {
            repo.save_category(&category).await?;
        }
        *catalog = next;
        info!("Category updated");
        Ok(category)
    }

    /// Define a product feature.
    ///
    /// # Errors
    ///
    /// Returns the catalog's errors, or a database error.
    #[instrument(skip(self, input), fields(category_id = %input.category_id, key = %input.key))]
    pub async fn add_feature(&self, input: NewFeature) -> Result<ProductFeature> {
        let mut catalog = self.catalog.write().await;
        let mut next = catalog.clone();
        let feature = next.add_feature(input)?;
        if let Some(repo) = self.repository() {
            repo.save_feature(&feature).await?;
        }
        *catalog = next;
        info!(feature_id = %feature.id, "Feature created");
        Ok(feature)
    }

    /// Register an allowed feature value.
    ///
    /// # Errors
    ///
    /// Returns the catalog's errors, or a database error.
    #[instrument(skip(self, input), fields(category_id = %input.category_id))]
    pub async fn add_validator(&self, input: NewValidator) -> Result<ProductFeatureValidator> {
        let mut catalog = self.catalog.write().await;
        let mut next = catalog.clone();
        let validator = next.add_validator(input)?;
        if let Some(repo) = self.repository() {
            repo.save_validator(&validator).await?;
        }
        *catalog = next;
        info!(validator_id = %validator.id, "Validator created");
        Ok(validator)
    }

    /// Add a product.
    ///
    /// # Errors
    ///
    /// Returns the draft's validation errors, the catalog's errors, or a
    /// database error.
    #[instrument(skip(self, draft))]
    pub async fn add_product(&self, draft: NewProduct) -> Result<Product> {
        let mut catalog = self.catalog.write().await;
        let mut next = catalog.clone();
        let product = next.add_product(draft)?;
        if let Some(repo) = self.repository() {
            repo.save_product(&product).await?;
        }
        *catalog = next;
        info!(product_id = %product.id, slug = %product.slug, "Product created");
        Ok(product)
    }

    fn repository(&self) -> Option<CatalogRepository<'_>> {
        self.pool.as_ref().map(CatalogRepository::new)
    }

    async fn product(&self, id: ProductId) -> Result<Product> {
        Ok(self.catalog.read().await.product(id)?.clone())
    }


    fn accounts(&self) -> Option<AccountRepository<'_>> {
        self.pool.as_ref().map(AccountRepository::new)
    }

    // =========================================================================
    // Customers
    // =========================================================================

    /// The customer for a user, created on first use.
    ///
    /// # Errors
    ///
    /// Returns a database error if a new customer cannot be persisted.
    #[instrument(skip(self))]
    pub async fn customer_for(&self, user_id: UserId) -> Result<Customer> {
        let mut customers = self.customers.write().await;
        if let Some(customer) = customers
            .by_user
            .get(&user_id)
            .and_then(|id| customers.by_id.get(id))
        {
            return Ok(customer.clone());
        }

        let id = CustomerId::new(self.next_customer_id.fetch_add(1, Ordering::Relaxed));
        let customer = Customer::new(id, user_id);
        if let Some(repo) = self.accounts() {
            repo.save_customer(&customer).await?;
        }
        customers.by_user.insert(user_id, id);
        customers.by_id.insert(id, customer.clone());
        info!(customer_id = %id, "Customer created");
        Ok(customer)
    }

    /// Replace a user's profile fields.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if a field is too long, or a database error.
    #[instrument(skip(self, profile))]
    pub async fn update_profile(
        &self,
        user_id: UserId,
        profile: CustomerProfile,
    ) -> Result<Customer> {
        let id = self.customer_for(user_id).await?.id;
        let mut customers = self.customers.write().await;
        let customer = customers
            .by_id
            .get_mut(&id)
            .ok_or_else(|| ShopError::not_found("customer", id))?;
        let mut next = customer.clone();
        next.update_profile(profile)?;
        if let Some(repo) = self.accounts() {
            repo.save_customer(&next).await?;
        }
        *customer = next;
        info!(customer_id = %id, "Customer profile updated");
        Ok(customer.clone())
    }

    /// All customers with their orders, oldest customer first.
    pub async fn customers(&self) -> Vec<(Customer, Vec<Order>)> {
        let customers = self.customers.read().await;
        let orders = self.orders.read().await;
        customers
            .by_id
            .values()
            .map(|c| {
                let history = c
                    .orders()
                    .iter()
                    .filter_map(|id| orders.get(id).cloned())
                    .collect();
                (c.clone(), history)
            })
            .collect()
    }

    // =========================================================================
    // Carts
    // =========================================================================

    /// Find the shopper's cart, creating it if `create` is set.
    ///
    /// A registered shopper always gets a cart: a checked-out cart is
    /// replaced by a fresh one. A guest reaches a cart only through the
    /// token handed out when it was opened.
    async fn resolve_cart(&self, shopper: Shopper, create: bool) -> Result<Option<ResolvedCart>> {
        match shopper {
            Shopper::Registered(user_id) => {
                let customer_id = self.customer_for(user_id).await?.id;
                let current = self
                    .carts
                    .read()
                    .await
                    .active_handle(customer_id)
                    .map(Arc::clone);
                if let Some(handle) = &current
                    && !handle.lock().await.in_order()
                {
                    return Ok(Some(ResolvedCart::registered(handle, customer_id)));
                }

                let mut carts = self.carts.write().await;
                // Someone else may have replaced the cart in the meantime
                if let Some(handle) = carts.active_handle(customer_id)
                    && !current.as_ref().is_some_and(|seen| Arc::ptr_eq(seen, handle))
                {
                    return Ok(Some(ResolvedCart::registered(handle, customer_id)));
                }
                let handle = self.open_cart(&mut carts, Some(customer_id), None);
                Ok(Some(ResolvedCart::registered(&handle, customer_id)))
            }
            Shopper::Guest(Some(token)) => {
                let carts = self.carts.read().await;
                let entry = carts
                    .guests
                    .get(&token)
                    .and_then(|id| carts.by_id.get(id))
                    .ok_or_else(|| ShopError::not_found("cart", token))?;
                Ok(Some(ResolvedCart {
                    handle: Arc::clone(&entry.handle),
                    added_by: None,
                    guest_token: Some(token),
                }))
            }
            Shopper::Guest(None) if create => {
                let token = GuestToken::generate();
                let mut carts = self.carts.write().await;
                let handle = self.open_cart(&mut carts, None, Some(token));
                Ok(Some(ResolvedCart {
                    handle,
                    added_by: None,
                    guest_token: Some(token),
                }))
            }
            Shopper::Guest(None) => Ok(None),
        }
    }

    fn open_cart(
        &self,
        carts: &mut Carts,
        owner: Option<CustomerId>,
        guest_token: Option<GuestToken>,
    ) -> CartHandle {
        let id = CartId::new(self.next_cart_id.fetch_add(1, Ordering::Relaxed));
        let handle = Arc::new(Mutex::new(Cart::new(id, owner)));
        carts.by_id.insert(
            id,
            CartEntry {
                handle: Arc::clone(&handle),
                guest_token,
            },
        );
        if let Some(customer) = owner {
            carts.active.insert(customer, id);
        }
        if let Some(token) = guest_token {
            carts.guests.insert(token, id);
        }
        info!(cart_id = %id, anonymous = owner.is_none(), "Cart created");
        handle
    }

    async fn existing_cart(&self, shopper: Shopper) -> Result<ResolvedCart> {
        self.resolve_cart(shopper, false)
            .await?
            .ok_or_else(|| ShopError::not_found("cart", "none").into())
    }

    /// Persist `next` and only then install it as the cart's state.
    async fn commit_cart(
        &self,
        cart: &mut Cart,
        next: Cart,
        guest_token: Option<GuestToken>,
    ) -> Result<()> {
        if let Some(repo) = self.accounts() {
            repo.save_cart(&next, guest_token.map(GuestToken::as_uuid))
                .await?;
        }
        *cart = next;
        Ok(())
    }

    /// Snapshot of the shopper's cart; `None` for a guest without one.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown guest token.
    #[instrument(skip(self))]
    pub async fn cart(&self, shopper: Shopper) -> Result<Option<ShopperCart>> {
        match self.resolve_cart(shopper, false).await? {
            Some(resolved) => {
                let cart = resolved.handle.lock().await;
                Ok(Some(resolved.snapshot(&cart)))
            }
            None => Ok(None),
        }
    }

    /// Add a product to the shopper's cart.
    ///
    /// Returns the cart after the change and the touched line.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown product or guest token, the cart's
    /// validation and precondition errors, or a database error.
    #[instrument(skip(self))]
    pub async fn add_to_cart(
        &self,
        shopper: Shopper,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(ShopperCart, CartLine)> {
        let product = self.product(product_id).await?;
        let resolved = self
            .resolve_cart(shopper, true)
            .await?
            .ok_or_else(|| ShopError::not_found("cart", "none"))?;

        let mut cart = resolved.handle.lock().await;
        let mut next = cart.clone();
        let line = next.add_or_increment(resolved.added_by, &product, quantity)?;
        self.commit_cart(&mut cart, next, resolved.guest_token)
            .await?;
        info!(
            cart_id = %cart.id(),
            line_id = %line.id,
            quantity = line.quantity,
            "Cart line saved"
        );
        Ok((resolved.snapshot(&cart), line))
    }

    /// Change a line's quantity; zero removes it.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown cart or line, the cart's
    /// validation and precondition errors, or a database error.
    #[instrument(skip(self))]
    pub async fn update_line(
        &self,
        shopper: Shopper,
        line_id: CartLineId,
        quantity: u32,
    ) -> Result<ShopperCart> {
        let resolved = self.existing_cart(shopper).await?;
        let mut cart = resolved.handle.lock().await;
        cart.ensure_editable()?;
        let product = self.product(cart.line(line_id)?.product_id).await?;
        let mut next = cart.clone();
        next.set_quantity(line_id, quantity, &product)?;
        self.commit_cart(&mut cart, next, resolved.guest_token)
            .await?;
        Ok(resolved.snapshot(&cart))
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown cart or line, `Precondition` for
    /// a checked-out cart, or a database error.
    #[instrument(skip(self))]
    pub async fn remove_line(&self, shopper: Shopper, line_id: CartLineId) -> Result<ShopperCart> {
        let resolved = self.existing_cart(shopper).await?;
        let mut cart = resolved.handle.lock().await;
        let mut next = cart.clone();
        next.remove(line_id)?;
        self.commit_cart(&mut cart, next, resolved.guest_token)
            .await?;
        Ok(resolved.snapshot(&cart))
    }

    /// Empty the shopper's cart.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown cart, `Precondition` for a
    /// checked-out cart, or a database error.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self, shopper: Shopper) -> Result<ShopperCart> {
        let resolved = self.existing_cart(shopper).await?;
        let mut cart = resolved.handle.lock().await;
        let mut next = cart.clone();
        next.clear()?;
        self.commit_cart(&mut cart, next, resolved.guest_token)
            .await?;
        Ok(resolved.snapshot(&cart))
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Check out a cart for a signed-in user.
    ///
    /// Uses the guest cart behind `guest_cart` when given (adopting it),
    /// otherwise the customer's own cart. Adopting a guest cart leaves the
    /// customer's open cart untouched.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown guest token, the checkout's
    /// validation and precondition errors, or a database error.
    #[instrument(skip(self, shipping))]
    pub async fn checkout(
        &self,
        user_id: UserId,
        guest_cart: Option<GuestToken>,
        shipping: ShippingInfo,
    ) -> Result<Order> {
        let resolved = match guest_cart {
            Some(token) => self.existing_cart(Shopper::Guest(Some(token))).await?,
            None => self.existing_cart(Shopper::Registered(user_id)).await?,
        };
        let customer_id = self.customer_for(user_id).await?.id;

        let mut cart = resolved.handle.lock().await;
        let mut customers = self.customers.write().await;
        let customer = customers
            .by_id
            .get_mut(&customer_id)
            .ok_or_else(|| ShopError::not_found("customer", customer_id))?;

        let mut next_cart = cart.clone();
        let mut next_customer = customer.clone();
        let order_id = OrderId::new(self.next_order_id.fetch_add(1, Ordering::Relaxed));
        let order = place_order(
            order_id,
            &mut next_cart,
            &mut next_customer,
            shipping,
            Utc::now(),
        )?;
        if let Some(repo) = self.accounts() {
            let position = next_customer.orders().len().saturating_sub(1);
            repo.save_order(
                &order,
                &next_cart,
                resolved.guest_token.map(GuestToken::as_uuid),
                position,
            )
            .await?;
        }
        *cart = next_cart;
        *customer = next_customer;
        self.orders.write().await.insert(order.id, order.clone());
        drop(customers);
        let cart_id = cart.id();
        drop(cart);

        info!(
            order_id = %order.id,
            cart_id = %cart_id,
            final_price = %order.final_price,
            "Order placed"
        );
        Ok(order)
    }

    /// A user's orders, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a database error if a new customer cannot be persisted.
    pub async fn orders_for(&self, user_id: UserId) -> Result<Vec<Order>> {
        let customer = self.customer_for(user_id).await?;
        let orders = self.orders.read().await;
        Ok(customer
            .orders()
            .iter()
            .filter_map(|id| orders.get(id).cloned())
            .collect())
    }

    /// Move an order to its next status.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown order, `Precondition` for a
    /// completed one, or a database error.
    #[instrument(skip(self))]
    pub async fn advance_order(&self, order_id: OrderId) -> Result<Order> {
        let mut orders = self.orders.write().await;
        let order = orders
            .get_mut(&order_id)
            .ok_or_else(|| ShopError::not_found("order", order_id))?;
        let mut next = order.clone();
        let status = next.advance()?;
        if let Some(repo) = self.accounts() {
            repo.save_order_status(order_id, status).await?;
        }
        *order = next;
        info!(%status, "Order advanced");
        Ok(order.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use gadget_shop_core::{NewCategory, OrderStatus, Price, ProductKind, StoredCart};
    use rust_decimal::Decimal;

    use super::*;
    use crate::error::AppError;

    fn phone(category_id: CategoryId, slug: &str, price: &str) -> NewProduct {
        NewProduct {
            category_id: Some(category_id),
            title: Some(slug.to_uppercase()),
            slug: Some(slug.to_string()),
            image: Some(format!("{slug}.jpg")),
            price: Some(price.parse::<Decimal>().unwrap()),
            kind: Some(ProductKind::Smartphone),
            diagonal: Some("6.1".to_string()),
            display: Some("OLED".to_string()),
            resolution: Some("2532x1170".to_string()),
            battery_capacity: Some("3200 mAh".to_string()),
            ram: Some("6".to_string()),
            removable_storage: Some(false),
            removable_storage_max: Some("0".to_string()),
            main_camera_mp: Some("12".to_string()),
            front_camera_mp: Some("12".to_string()),
            ..NewProduct::default()
        }
    }

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new();
        let category = catalog
            .add_category(NewCategory {
                name: "Smartphones".to_string(),
                slug: "smartphones".to_string(),
            })
            .unwrap();
        catalog.add_product(phone(category.id, "alpha", "599.99")).unwrap();
        catalog.add_product(phone(category.id, "beta", "19.99")).unwrap();
        catalog
    }

    fn service() -> ShopService {
        ShopService::new(catalog(), None)
    }

    fn shipping() -> ShippingInfo {
        ShippingInfo {
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            phone: "15550001234".to_string(),
            ..ShippingInfo::default()
        }
    }

    const ALPHA: ProductId = ProductId::new(1);
    const BETA: ProductId = ProductId::new(2);
    const USER: UserId = UserId::new(42);
    const OTHER_USER: UserId = UserId::new(43);

    async fn registered_cart(shop: &ShopService, user_id: UserId) -> Cart {
        shop.cart(Shopper::Registered(user_id))
            .await
            .unwrap()
            .unwrap()
            .cart
    }

    #[tokio::test]
    async fn test_registered_cart_is_created_lazily() {
        let shop = service();
        let cart = registered_cart(&shop, USER).await;
        assert!(cart.is_empty());

        let (added, line) = shop
            .add_to_cart(Shopper::Registered(USER), ALPHA, 2)
            .await
            .unwrap();
        assert_eq!(line.final_price.to_string(), "1199.98");
        assert_eq!(added.guest_token, None);
        assert_eq!(
            added.cart.owner(),
            Some(shop.customer_for(USER).await.unwrap().id)
        );

        // Same customer, same cart
        assert_eq!(registered_cart(&shop, USER).await.id(), added.cart.id());
    }

    #[tokio::test]
    async fn test_guest_cart_round_trip() {
        let shop = service();
        assert!(shop.cart(Shopper::Guest(None)).await.unwrap().is_none());

        let (added, line) = shop.add_to_cart(Shopper::Guest(None), BETA, 1).await.unwrap();
        assert!(added.cart.for_anonymous_user());
        let guest = Shopper::Guest(added.guest_token);
        assert!(added.guest_token.is_some());

        let updated = shop.update_line(guest, line.id, 3).await.unwrap();
        assert_eq!(updated.cart.total_products(), 3);
        assert_eq!(updated.cart.final_price().to_string(), "59.97");
        assert_eq!(updated.guest_token, added.guest_token);

        let removed = shop.remove_line(guest, line.id).await.unwrap();
        assert_eq!(removed.cart.final_price(), Price::ZERO);
    }

    #[tokio::test]
    async fn test_guest_cart_needs_its_token() {
        let shop = service();
        let (first, _) = shop.add_to_cart(Shopper::Guest(None), BETA, 1).await.unwrap();
        let (second, _) = shop.add_to_cart(Shopper::Guest(None), ALPHA, 1).await.unwrap();
        assert_ne!(first.guest_token, second.guest_token);

        // Neither a fresh token nor one built from the cart id reaches a cart
        let guessed = [
            GuestToken::generate(),
            GuestToken::from(Uuid::from_u128(first.cart.id().as_i32().try_into().unwrap())),
        ];
        for token in guessed {
            let err = shop.cart(Shopper::Guest(Some(token))).await.unwrap_err();
            assert!(matches!(err, AppError::Shop(ShopError::NotFound { .. })));
        }

        let own = shop.cart(Shopper::Guest(second.guest_token)).await.unwrap().unwrap();
        assert_eq!(own.cart.id(), second.cart.id());
    }

    #[test]
    fn test_guest_token_text_form() {
        let token = GuestToken::generate();
        let parsed: GuestToken = token.to_string().parse().unwrap();
        assert_eq!(parsed, token);
        assert!("5".parse::<GuestToken>().is_err());
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let shop = service();
        let err = shop
            .add_to_cart(Shopper::Registered(USER), ProductId::new(99), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Shop(ShopError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_concurrent_adds_keep_exact_totals() {
        let shop = Arc::new(service());
        let mut tasks = Vec::new();
        for i in 0..50 {
            let shop = Arc::clone(&shop);
            let product = if i % 2 == 0 { ALPHA } else { BETA };
            tasks.push(tokio::spawn(async move {
                shop.add_to_cart(Shopper::Registered(USER), product, 1)
                    .await
                    .unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let cart = registered_cart(&shop, USER).await;
        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.total_products(), 50);
        // 25 × 599.99 + 25 × 19.99
        assert_eq!(cart.final_price().to_string(), "15499.50");
        assert!(cart.aggregates_consistent());
    }

    #[tokio::test]
    async fn test_busy_cart_does_not_block_other_shoppers() {
        let shop = Arc::new(service());
        shop.add_to_cart(Shopper::Registered(USER), ALPHA, 1)
            .await
            .unwrap();
        let handle = shop
            .existing_cart(Shopper::Registered(USER))
            .await
            .unwrap()
            .handle;
        let guard = handle.lock().await;

        let waiting = {
            let shop = Arc::clone(&shop);
            tokio::spawn(async move { registered_cart(&shop, USER).await.id() })
        };
        tokio::task::yield_now().await;

        // USER's lookup is parked on the cart lock; the registry stays free
        let other = tokio::time::timeout(
            Duration::from_secs(1),
            shop.add_to_cart(Shopper::Registered(OTHER_USER), BETA, 1),
        )
        .await;
        assert!(other.unwrap().is_ok());

        let cart_id = guard.id();
        drop(guard);
        assert_eq!(waiting.await.unwrap(), cart_id);
    }

    #[tokio::test]
    async fn test_concurrent_lookups_after_checkout_share_one_cart() {
        let shop = Arc::new(service());
        shop.add_to_cart(Shopper::Registered(USER), ALPHA, 1)
            .await
            .unwrap();
        let order = shop.checkout(USER, None, shipping()).await.unwrap();

        let mut tasks = Vec::new();
        for _ in 0..20 {
            let shop = Arc::clone(&shop);
            tasks.push(tokio::spawn(async move {
                registered_cart(&shop, USER).await.id()
            }));
        }
        let mut ids = Vec::new();
        for task in tasks {
            ids.push(task.await.unwrap());
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);
        assert_ne!(Some(ids[0]), order.cart_id);
    }

    #[tokio::test]
    async fn test_checkout_opens_a_new_cart() {
        let shop = service();
        let shopper = Shopper::Registered(USER);
        let (added, _) = shop.add_to_cart(shopper, ALPHA, 1).await.unwrap();

        let order = shop.checkout(USER, None, shipping()).await.unwrap();
        assert_eq!(order.final_price.to_string(), "599.99");
        assert_eq!(order.cart_id, Some(added.cart.id()));

        let next = registered_cart(&shop, USER).await;
        assert_ne!(next.id(), added.cart.id());
        assert!(next.is_empty());

        // The checked-out cart is frozen
        let err = shop
            .checkout(USER, None, shipping())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Shop(ShopError::Precondition(_))));
        assert_eq!(shop.orders_for(USER).await.unwrap(), vec![order]);
    }

    #[tokio::test]
    async fn test_checkout_adopts_guest_cart() {
        let shop = service();
        let (added, _) = shop.add_to_cart(Shopper::Guest(None), BETA, 2).await.unwrap();

        let order = shop
            .checkout(USER, added.guest_token, shipping())
            .await
            .unwrap();
        assert_eq!(order.total_products, 2);

        let err = shop
            .add_to_cart(Shopper::Guest(added.guest_token), BETA, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Shop(ShopError::Precondition(_))));

        let customers = shop.customers().await;
        assert_eq!(customers.len(), 1);
        assert_eq!(customers[0].1.len(), 1);
    }

    #[tokio::test]
    async fn test_guest_checkout_keeps_customer_cart() {
        let shop = service();
        let (own, _) = shop
            .add_to_cart(Shopper::Registered(USER), ALPHA, 3)
            .await
            .unwrap();
        let (guest, _) = shop.add_to_cart(Shopper::Guest(None), BETA, 1).await.unwrap();

        let order = shop
            .checkout(USER, guest.guest_token, shipping())
            .await
            .unwrap();
        assert_eq!(order.cart_id, Some(guest.cart.id()));

        let cart = registered_cart(&shop, USER).await;
        assert_eq!(cart.id(), own.cart.id());
        assert_eq!(cart.total_products(), 3);
        assert!(!cart.in_order());
    }

    #[tokio::test]
    async fn test_advance_order() {
        let shop = service();
        shop.add_to_cart(Shopper::Registered(USER), ALPHA, 1)
            .await
            .unwrap();
        let order = shop.checkout(USER, None, shipping()).await.unwrap();

        for expected in [OrderStatus::InProgress, OrderStatus::Ready, OrderStatus::Completed] {
            assert_eq!(shop.advance_order(order.id).await.unwrap().status, expected);
        }
        assert!(shop.advance_order(order.id).await.is_err());
        assert!(matches!(
            shop.advance_order(OrderId::new(77)).await,
            Err(AppError::Shop(ShopError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_update_profile() {
        let shop = service();
        let customer = shop
            .update_profile(
                USER,
                CustomerProfile {
                    first_name: "Grace".to_string(),
                    last_name: "Hopper".to_string(),
                    phone: Some("15550001234".to_string()),
                    address: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(customer.first_name, "Grace");

        let err = shop
            .update_profile(
                USER,
                CustomerProfile {
                    phone: Some("1".repeat(17)),
                    ..CustomerProfile::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Shop(ShopError::Validation { .. })));
        assert_eq!(shop.customer_for(USER).await.unwrap().first_name, "Grace");
    }

    #[tokio::test]
    async fn test_restore_picks_up_stored_accounts() {
        let customer = Customer::new(CustomerId::new(4), USER).with_orders(vec![OrderId::new(9)]);
        let empty = |id: i32, owner: Option<CustomerId>, in_order: bool, anonymous: bool| {
            Cart::restore(StoredCart {
                id: CartId::new(id),
                owner,
                lines: Vec::new(),
                in_order,
                for_anonymous_user: anonymous,
            })
            .unwrap()
        };
        let token = Uuid::new_v4();
        let accounts = StoredAccounts {
            customers: vec![customer.clone()],
            carts: vec![
                (empty(7, Some(customer.id), false, false), None),
                (empty(3, Some(customer.id), true, false), None),
                (empty(8, Some(customer.id), true, true), Some(Uuid::new_v4())),
                (empty(5, None, false, true), Some(token)),
            ],
            orders: Vec::new(),
        };
        let shop = ShopService::restore(catalog(), None, accounts);

        // Known user keeps their customer and open cart
        assert_eq!(shop.customer_for(USER).await.unwrap().id, customer.id);
        assert_eq!(registered_cart(&shop, USER).await.id(), CartId::new(7));

        let guest = shop
            .cart(Shopper::Guest(Some(GuestToken::from(token))))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(guest.cart.id(), CartId::new(5));

        // Counters continue after the stored ids
        assert_eq!(shop.customer_for(OTHER_USER).await.unwrap().id, CustomerId::new(5));
        assert_eq!(registered_cart(&shop, OTHER_USER).await.id(), CartId::new(9));
    }

    #[tokio::test]
    async fn test_rejected_catalog_write_leaves_catalog_unchanged() {
        let shop = service();
        let err = shop
            .add_category(NewCategory {
                name: "Duplicate".to_string(),
                slug: "smartphones".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Shop(ShopError::Integrity(_))));
        assert_eq!(shop.catalog().await.categories().count(), 1);

        let category = shop
            .add_category(NewCategory {
                name: "Notebooks".to_string(),
                slug: "notebooks".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(category.id, CategoryId::new(2));
    }
}
