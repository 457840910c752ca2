//! Customer, cart and order repository.
//!
//! The shop service persists each change here before applying it in memory,
//! and reloads everything from it on startup.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, instrument};
use uuid::Uuid;

use gadget_shop_core::{
    BuyingType, Cart, CartId, CartLine, CartLineId, Customer, CustomerId, Order, OrderId,
    OrderStatus, Price, ProductId, StoredCart, UserId,
};

use super::RepositoryError;

/// Everything the shop service keeps about shoppers.
#[derive(Debug, Default)]
pub struct StoredAccounts {
    pub customers: Vec<Customer>,
    /// Carts with the token of guest carts.
    pub carts: Vec<(Cart, Option<Uuid>)>,
    pub orders: Vec<Order>,
}

#[derive(sqlx::FromRow)]
struct CustomerRow {
    id: CustomerId,
    user_id: UserId,
    first_name: String,
    last_name: String,
    phone: Option<String>,
    address: Option<String>,
}

#[derive(sqlx::FromRow)]
struct CustomerOrderRow {
    customer_id: CustomerId,
    order_id: OrderId,
}

#[derive(sqlx::FromRow)]
struct CartRow {
    id: CartId,
    owner_id: Option<CustomerId>,
    in_order: bool,
    for_anonymous_user: bool,
    guest_token: Option<Uuid>,
}

#[derive(sqlx::FromRow)]
struct CartLineRow {
    cart_id: CartId,
    id: CartLineId,
    product_id: ProductId,
    customer_id: Option<CustomerId>,
    quantity: i32,
    unit_price: Decimal,
    final_price: Decimal,
}

impl CartLineRow {
    fn into_line(self) -> Result<CartLine, RepositoryError> {
        let corrupt = |what: &str| {
            RepositoryError::DataCorruption(format!(
                "cart {} line {} has invalid {what}",
                self.cart_id, self.id
            ))
        };
        Ok(CartLine {
            id: self.id,
            product_id: self.product_id,
            added_by: self.customer_id,
            quantity: u32::try_from(self.quantity).map_err(|_| corrupt("quantity"))?,
            unit_price: Price::new(self.unit_price).map_err(|_| corrupt("unit_price"))?,
            final_price: Price::total(self.final_price).map_err(|_| corrupt("final_price"))?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    customer_id: CustomerId,
    first_name: String,
    last_name: String,
    phone: String,
    address: Option<String>,
    cart_id: Option<CartId>,
    total_products: i32,
    final_price: Decimal,
    status: OrderStatus,
    buying_type: BuyingType,
    comment: Option<String>,
    created_at: DateTime<Utc>,
    requested_date: NaiveDate,
}

impl OrderRow {
    fn into_order(self) -> Result<Order, RepositoryError> {
        let corrupt =
            |what: &str| RepositoryError::DataCorruption(format!("order {} has invalid {what}", self.id));
        Ok(Order {
            id: self.id,
            customer_id: self.customer_id,
            first_name: self.first_name,
            last_name: self.last_name,
            phone: self.phone,
            address: self.address,
            cart_id: self.cart_id,
            total_products: u32::try_from(self.total_products)
                .map_err(|_| corrupt("total_products"))?,
            final_price: Price::total(self.final_price).map_err(|_| corrupt("final_price"))?,
            status: self.status,
            buying_type: self.buying_type,
            comment: self.comment,
            created_at: self.created_at,
            requested_date: self.requested_date,
        })
    }
}

fn to_i32(value: u32, what: &str) -> Result<i32, RepositoryError> {
    i32::try_from(value)
        .map_err(|_| RepositoryError::DataCorruption(format!("{what} {value} does not fit a column")))
}

/// Repository for customers, carts and orders.
pub struct AccountRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AccountRepository<'a> {
    /// Create a new account repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Load every customer, cart and order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails and
    /// `RepositoryError::DataCorruption` or `RepositoryError::Shop` for rows
    /// that cannot be turned back into valid entities.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<StoredAccounts, RepositoryError> {
        let customer_rows: Vec<CustomerRow> = sqlx::query_as(
            "SELECT id, user_id, first_name, last_name, phone, address FROM customer ORDER BY id",
        )
        .fetch_all(self.pool)
        .await?;
        let history: Vec<CustomerOrderRow> = sqlx::query_as(
            "SELECT customer_id, order_id FROM customer_order ORDER BY customer_id, position",
        )
        .fetch_all(self.pool)
        .await?;

        let customers = customer_rows
            .into_iter()
            .map(|row| {
                let orders = history
                    .iter()
                    .filter(|h| h.customer_id == row.id)
                    .map(|h| h.order_id)
                    .collect();
                let mut customer = Customer::new(row.id, row.user_id).with_orders(orders);
                customer.first_name = row.first_name;
                customer.last_name = row.last_name;
                customer.phone = row.phone;
                customer.address = row.address;
                customer
            })
            .collect();

        let cart_rows: Vec<CartRow> = sqlx::query_as(
            "SELECT id, owner_id, in_order, for_anonymous_user, guest_token FROM cart ORDER BY id",
        )
        .fetch_all(self.pool)
        .await?;
        let line_rows: Vec<CartLineRow> = sqlx::query_as(
            r"
            SELECT cart_id, id, product_id, customer_id, quantity, unit_price, final_price
            FROM cart_product
            ORDER BY cart_id, id
            ",
        )
        .fetch_all(self.pool)
        .await?;
        let mut lines = line_rows
            .into_iter()
            .map(|row| Ok((row.cart_id, row.into_line()?)))
            .collect::<Result<Vec<_>, RepositoryError>>()?;

        let mut carts = Vec::with_capacity(cart_rows.len());
        for row in cart_rows {
            let (own, rest): (Vec<_>, Vec<_>) =
                lines.into_iter().partition(|(cart_id, _)| *cart_id == row.id);
            lines = rest;
            let cart = Cart::restore(StoredCart {
                id: row.id,
                owner: row.owner_id,
                lines: own.into_iter().map(|(_, line)| line).collect(),
                in_order: row.in_order,
                for_anonymous_user: row.for_anonymous_user,
            })?;
            carts.push((cart, row.guest_token));
        }

        let order_rows: Vec<OrderRow> = sqlx::query_as(
            r"
            SELECT id, customer_id, first_name, last_name, phone, address, cart_id,
                   total_products, final_price, status, buying_type, comment,
                   created_at, requested_date
            FROM shop_order
            ORDER BY id
            ",
        )
        .fetch_all(self.pool)
        .await?;
        let orders = order_rows
            .into_iter()
            .map(OrderRow::into_order)
            .collect::<Result<Vec<_>, _>>()?;

        let accounts = StoredAccounts {
            customers,
            carts,
            orders,
        };
        debug!(
            customers = accounts.customers.len(),
            carts = accounts.carts.len(),
            orders = accounts.orders.len(),
            "Loaded accounts"
        );
        Ok(accounts)
    }

    /// Insert or update a customer's profile.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn save_customer(&self, customer: &Customer) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO customer (id, user_id, first_name, last_name, phone, address)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                phone = EXCLUDED.phone,
                address = EXCLUDED.address
            ",
        )
        .bind(customer.id)
        .bind(customer.user_id)
        .bind(&customer.first_name)
        .bind(&customer.last_name)
        .bind(&customer.phone)
        .bind(&customer.address)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Write a cart and replace its lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn save_cart(
        &self,
        cart: &Cart,
        guest_token: Option<Uuid>,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        write_cart(&mut tx, cart, guest_token).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Record a placed order together with the frozen cart.
    ///
    /// `position` is the order's index in the customer's history.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip_all, fields(order_id = %order.id))]
    pub async fn save_order(
        &self,
        order: &Order,
        cart: &Cart,
        guest_token: Option<Uuid>,
        position: usize,
    ) -> Result<(), RepositoryError> {
        let position = i32::try_from(position).map_err(|_| {
            RepositoryError::DataCorruption(format!("order position {position} does not fit"))
        })?;
        let mut tx = self.pool.begin().await?;
        write_cart(&mut tx, cart, guest_token).await?;
        sqlx::query(
            r"
            INSERT INTO shop_order
                (id, customer_id, first_name, last_name, phone, address, cart_id,
                 total_products, final_price, status, buying_type, comment,
                 created_at, requested_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ",
        )
        .bind(order.id)
        .bind(order.customer_id)
        .bind(&order.first_name)
        .bind(&order.last_name)
        .bind(&order.phone)
        .bind(&order.address)
        .bind(order.cart_id)
        .bind(to_i32(order.total_products, "total_products")?)
        .bind(order.final_price.amount())
        .bind(order.status)
        .bind(order.buying_type)
        .bind(&order.comment)
        .bind(order.created_at)
        .bind(order.requested_date)
        .execute(&mut *tx)
        .await?;
        sqlx::query("INSERT INTO customer_order (customer_id, order_id, position) VALUES ($1, $2, $3)")
            .bind(order.customer_id)
            .bind(order.id)
            .bind(position)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Store an order's new status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn save_order_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE shop_order SET status = $2 WHERE id = $1")
            .bind(order_id)
            .bind(status)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}

async fn write_cart(
    conn: &mut PgConnection,
    cart: &Cart,
    guest_token: Option<Uuid>,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO cart
            (id, owner_id, total_products, final_price, in_order, for_anonymous_user, guest_token)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (id) DO UPDATE SET
            owner_id = EXCLUDED.owner_id,
            total_products = EXCLUDED.total_products,
            final_price = EXCLUDED.final_price,
            in_order = EXCLUDED.in_order
        ",
    )
    .bind(cart.id())
    .bind(cart.owner())
    .bind(to_i32(cart.total_products(), "total_products")?)
    .bind(cart.final_price().amount())
    .bind(cart.in_order())
    .bind(cart.for_anonymous_user())
    .bind(guest_token)
    .execute(&mut *conn)
    .await?;

    sqlx::query("DELETE FROM cart_product WHERE cart_id = $1")
        .bind(cart.id())
        .execute(&mut *conn)
        .await?;
    for line in cart.lines() {
        sqlx::query(
            r"
            INSERT INTO cart_product
                (cart_id, id, product_id, customer_id, quantity, unit_price, final_price)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(cart.id())
        .bind(line.id)
        .bind(line.product_id)
        .bind(line.added_by)
        .bind(to_i32(line.quantity, "quantity")?)
        .bind(line.unit_price)
        .bind(line.final_price.amount())
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}
