//! Shopping cart and its pricing engine.
//!
//! A [`Cart`] owns its line items and two cached aggregates,
//! `total_products` and `final_price`. Every mutating method recomputes the
//! touched line and then both aggregates before returning, so after any call
//! that returns `Ok`:
//!
//! ```text
//! cart.final_price    == Σ line.final_price
//! cart.total_products == Σ line.quantity
//! line.final_price    == line.quantity × line.unit_price
//! ```
//!
//! Mutations are all-or-nothing: when one fails (overflow, bad input) the cart
//! is left exactly as it was. Once the cart is checked out (`in_order`) every
//! mutation fails with [`ShopError::Precondition`].

use serde::Serialize;

use crate::error::{Result, ShopError};
use crate::product::Product;
use crate::types::{CartId, CartLineId, CustomerId, Price, ProductId};

/// One product with a quantity inside a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub id: CartLineId,
    pub product_id: ProductId,
    /// Customer who added the line; `None` in anonymous carts.
    pub added_by: Option<CustomerId>,
    pub quantity: u32,
    /// Product price when the line was last saved.
    pub unit_price: Price,
    pub final_price: Price,
}

impl CartLine {
    fn reprice(&mut self, unit_price: Price, quantity: u32) -> Result<()> {
        let final_price = unit_price
            .times(quantity)
            .map_err(|e| ShopError::price("quantity", &e))?;
        self.unit_price = unit_price;
        self.quantity = quantity;
        self.final_price = final_price;
        Ok(())
    }
}

/// A cart as read back from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCart {
    pub id: CartId,
    pub owner: Option<CustomerId>,
    pub lines: Vec<CartLine>,
    pub in_order: bool,
    pub for_anonymous_user: bool,
}

/// A customer's (or anonymous visitor's) cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cart {
    id: CartId,
    owner: Option<CustomerId>,
    lines: Vec<CartLine>,
    total_products: u32,
    final_price: Price,
    in_order: bool,
    for_anonymous_user: bool,
    #[serde(skip)]
    next_line_id: i32,
}

impl Cart {
    /// Create an empty cart. A cart without an owner is anonymous.
    #[must_use]
    pub const fn new(id: CartId, owner: Option<CustomerId>) -> Self {
        Self {
            id,
            owner,
            lines: Vec::new(),
            total_products: 0,
            final_price: Price::ZERO,
            in_order: false,
            for_anonymous_user: owner.is_none(),
            next_line_id: 1,
        }
    }

    /// Rebuild a cart from storage, recomputing the aggregates.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::Integrity`] if a line has a zero quantity, a
    /// price that does not match its quantity, or repeats a product or line
    /// id.
    pub fn restore(stored: StoredCart) -> Result<Self> {
        let cart_id = stored.id;
        for (i, line) in stored.lines.iter().enumerate() {
            let broken = |reason: &str| {
                ShopError::integrity(format!("cart {cart_id} line {}: {reason}", line.id))
            };
            if line.quantity == 0 {
                return Err(broken("zero quantity"));
            }
            if line.unit_price.times(line.quantity).ok() != Some(line.final_price) {
                return Err(broken("price does not match quantity"));
            }
            if stored.lines[..i]
                .iter()
                .any(|l| l.id == line.id || l.product_id == line.product_id)
            {
                return Err(broken("duplicate line"));
            }
        }

        let (total_products, final_price) = totals(&stored.lines)?;
        let next_line_id = stored
            .lines
            .iter()
            .map(|l| l.id.as_i32())
            .max()
            .unwrap_or(0)
            + 1;
        Ok(Self {
            id: stored.id,
            owner: stored.owner,
            lines: stored.lines,
            total_products,
            final_price,
            in_order: stored.in_order,
            for_anonymous_user: stored.for_anonymous_user,
            next_line_id,
        })
    }

    #[must_use]
    pub const fn id(&self) -> CartId {
        self.id
    }

    #[must_use]
    pub const fn owner(&self) -> Option<CustomerId> {
        self.owner
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Look up a line by id.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::NotFound`] for a line not in this cart.
    pub fn line(&self, line_id: CartLineId) -> Result<&CartLine> {
        self.lines
            .iter()
            .find(|l| l.id == line_id)
            .ok_or_else(|| ShopError::not_found("cart line", line_id))
    }

    /// The line holding a product, if any.
    #[must_use]
    pub fn line_for(&self, product_id: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }

    /// Sum of all line quantities.
    #[must_use]
    pub const fn total_products(&self) -> u32 {
        self.total_products
    }

    /// Sum of all line prices.
    #[must_use]
    pub const fn final_price(&self) -> Price {
        self.final_price
    }

    /// `true` once the cart has been turned into an order.
    #[must_use]
    pub const fn in_order(&self) -> bool {
        self.in_order
    }

    /// `true` if the cart was created for a visitor without an account.
    #[must_use]
    pub const fn for_anonymous_user(&self) -> bool {
        self.for_anonymous_user
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Add `quantity` of a product, merging with an existing line.
    ///
    /// The line's unit price is refreshed from `product`.
    ///
    /// # Errors
    ///
    /// - [`ShopError::Precondition`] if the cart is checked out
    /// - [`ShopError::Validation`] for a zero quantity or on overflow
    pub fn add_or_increment(
        &mut self,
        added_by: Option<CustomerId>,
        product: &Product,
        quantity: u32,
    ) -> Result<CartLine> {
        self.ensure_editable()?;
        ensure_positive(quantity)?;

        let next_line_id = CartLineId::new(self.next_line_id);
        let line_id = self.apply(|lines| {
            if let Some(line) = lines.iter_mut().find(|l| l.product_id == product.id) {
                let quantity = line
                    .quantity
                    .checked_add(quantity)
                    .ok_or_else(|| ShopError::validation("quantity", "quantity overflow"))?;
                line.reprice(product.price, quantity)?;
                return Ok(line.id);
            }

            let mut line = CartLine {
                id: next_line_id,
                product_id: product.id,
                added_by,
                quantity: 0,
                unit_price: product.price,
                final_price: Price::ZERO,
            };
            line.reprice(product.price, quantity)?;
            lines.push(line);
            Ok(next_line_id)
        })?;

        if line_id == next_line_id {
            self.next_line_id += 1;
        }
        self.line(line_id).cloned()
    }

    /// Change a line's quantity; zero removes the line.
    ///
    /// `product` is the line's current product, its price is saved on the
    /// line. Returns the updated line, or `None` if it was removed.
    ///
    /// # Errors
    ///
    /// - [`ShopError::Precondition`] if the cart is checked out
    /// - [`ShopError::NotFound`] for a line not in this cart
    /// - [`ShopError::Validation`] if `product` is not the line's product or
    ///   on overflow
    pub fn set_quantity(
        &mut self,
        line_id: CartLineId,
        quantity: u32,
        product: &Product,
    ) -> Result<Option<CartLine>> {
        self.ensure_editable()?;
        if quantity == 0 {
            self.remove(line_id)?;
            return Ok(None);
        }

        let line = self.line(line_id)?;
        if line.product_id != product.id {
            return Err(ShopError::validation(
                "product",
                format!(
                    "line {line_id} holds product {}, not {}",
                    line.product_id, product.id
                ),
            ));
        }

        self.apply(|lines| {
            if let Some(line) = lines.iter_mut().find(|l| l.id == line_id) {
                line.reprice(product.price, quantity)?;
            }
            Ok(())
        })?;
        self.line(line_id).cloned().map(Some)
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// - [`ShopError::Precondition`] if the cart is checked out
    /// - [`ShopError::NotFound`] for a line not in this cart
    pub fn remove(&mut self, line_id: CartLineId) -> Result<CartLine> {
        self.ensure_editable()?;
        let removed = self.line(line_id)?.clone();
        self.apply(|lines| {
            lines.retain(|l| l.id != line_id);
            Ok(())
        })?;
        Ok(removed)
    }

    /// Remove every line.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::Precondition`] if the cart is checked out.
    pub fn clear(&mut self) -> Result<()> {
        self.ensure_editable()?;
        self.apply(|lines| {
            lines.clear();
            Ok(())
        })
    }

    /// Check that the cached aggregates match the lines.
    #[must_use]
    pub fn aggregates_consistent(&self) -> bool {
        let lines_ok = self.lines.iter().all(|l| {
            l.unit_price
                .times(l.quantity)
                .is_ok_and(|p| p == l.final_price)
        });
        let total: u64 = self.lines.iter().map(|l| u64::from(l.quantity)).sum();
        let price: Price = self.lines.iter().map(|l| l.final_price).sum();
        lines_ok && total == u64::from(self.total_products) && price == self.final_price
    }

    /// Fail with [`ShopError::Precondition`] if the cart is checked out.
    ///
    /// # Errors
    ///
    /// See above.
    pub fn ensure_editable(&self) -> Result<()> {
        if self.in_order {
            return Err(ShopError::precondition(format!(
                "cart {} is already checked out",
                self.id
            )));
        }
        Ok(())
    }

    /// Freeze the cart for checkout, adopting `customer` if anonymous.
    pub(crate) fn mark_in_order(&mut self, customer: CustomerId) {
        self.owner.get_or_insert(customer);
        self.in_order = true;
    }

    /// Run a line mutation and recompute the aggregates; roll back on error.
    fn apply<T>(&mut self, mutation: impl FnOnce(&mut Vec<CartLine>) -> Result<T>) -> Result<T> {
        let snapshot = self.lines.clone();
        let outcome = mutation(&mut self.lines).and_then(|value| {
            let (total_products, final_price) = totals(&self.lines)?;
            self.total_products = total_products;
            self.final_price = final_price;
            Ok(value)
        });
        if outcome.is_err() {
            self.lines = snapshot;
        }
        debug_assert!(self.aggregates_consistent());
        outcome
    }
}

fn totals(lines: &[CartLine]) -> Result<(u32, Price)> {
    lines.iter().try_fold((0_u32, Price::ZERO), |(qty, price), line| {
        let qty = qty
            .checked_add(line.quantity)
            .ok_or_else(|| ShopError::validation("quantity", "cart quantity overflow"))?;
        let price = price
            .checked_add(line.final_price)
            .map_err(|e| ShopError::price("final_price", &e))?;
        Ok((qty, price))
    })
}

fn ensure_positive(quantity: u32) -> Result<()> {
    if quantity == 0 {
        return Err(ShopError::validation("quantity", "must be at least 1"));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::product::tests::{notebook_draft, smartphone_draft};

    fn product(id: i32, price: &str) -> Product {
        smartphone_draft(1, &format!("phone-{id}"), price)
            .validate(ProductId::new(id))
            .unwrap()
    }

    fn cart() -> Cart {
        Cart::new(CartId::new(1), Some(CustomerId::new(1)))
    }

    fn assert_consistent(cart: &Cart) {
        let qty: u32 = cart.lines().iter().map(|l| l.quantity).sum();
        let price: Price = cart.lines().iter().map(|l| l.final_price).sum();
        assert_eq!(cart.total_products(), qty);
        assert_eq!(cart.final_price(), price);
        assert!(cart.aggregates_consistent());
    }

    #[test]
    fn test_restore_recomputes_aggregates() {
        let phone = product(1, "599.99");
        let laptop = product(2, "999.00");
        let mut original = cart();
        original.add_or_increment(None, &phone, 2).unwrap();
        original.add_or_increment(None, &laptop, 1).unwrap();

        let mut restored = Cart::restore(StoredCart {
            id: original.id(),
            owner: original.owner(),
            lines: original.lines().to_vec(),
            in_order: false,
            for_anonymous_user: false,
        })
        .unwrap();
        assert_eq!(restored, original);

        // New lines continue after the stored ones
        let third = restored.add_or_increment(None, &product(3, "1.00"), 1).unwrap();
        assert_eq!(third.id, CartLineId::new(3));
        assert_consistent(&restored);
    }

    #[test]
    fn test_restore_rejects_inconsistent_lines() {
        let mut original = cart();
        let line = original.add_or_increment(None, &product(1, "10.00"), 2).unwrap();
        let stored = |lines: Vec<CartLine>| StoredCart {
            id: original.id(),
            owner: None,
            lines,
            in_order: false,
            for_anonymous_user: true,
        };

        let mispriced = CartLine {
            final_price: Price::parse("15.00").unwrap(),
            ..line.clone()
        };
        let duplicate = CartLine {
            id: CartLineId::new(2),
            ..line.clone()
        };
        let empty = CartLine {
            quantity: 0,
            final_price: Price::ZERO,
            ..line.clone()
        };
        for lines in [vec![mispriced], vec![line.clone(), duplicate], vec![empty]] {
            let err = Cart::restore(stored(lines)).unwrap_err();
            assert_eq!(err.kind(), "integrity");
        }
    }

    #[test]
    fn test_new_cart_is_empty() {
        let cart = cart();
        assert!(cart.is_empty());
        assert_eq!(cart.total_products(), 0);
        assert_eq!(cart.final_price(), Price::ZERO);
        assert!(!cart.in_order());
        assert!(!cart.for_anonymous_user());

        let anonymous = Cart::new(CartId::new(2), None);
        assert!(anonymous.for_anonymous_user());
        assert_eq!(anonymous.owner(), None);
    }

    #[test]
    fn test_add_increment_remove_example() {
        let phone = product(1, "599.99");
        let mut cart = cart();

        let line = cart.add_or_increment(None, &phone, 2).unwrap();
        assert_eq!(line.final_price.to_string(), "1199.98");
        assert_eq!(cart.total_products(), 2);
        assert_eq!(cart.final_price().to_string(), "1199.98");

        let line = cart.add_or_increment(None, &phone, 1).unwrap();
        assert_eq!(line.quantity, 3);
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.total_products(), 3);
        assert_eq!(cart.final_price().to_string(), "1799.97");

        cart.remove(line.id).unwrap();
        assert_eq!(cart.total_products(), 0);
        assert_eq!(cart.final_price().to_string(), "0.00");
    }

    #[test]
    fn test_repeated_adds_equal_single_add() {
        let phone = product(1, "19.99");

        let mut split = cart();
        split.add_or_increment(None, &phone, 2).unwrap();
        split.add_or_increment(None, &phone, 3).unwrap();

        let mut single = cart();
        single.add_or_increment(None, &phone, 5).unwrap();

        assert_eq!(split, single);
    }

    #[test]
    fn test_interleaved_operations_keep_aggregates() {
        let a = product(1, "599.99");
        let b = product(2, "0.10");
        let c = notebook_draft(1, "laptop", "1299.00")
            .validate(ProductId::new(3))
            .unwrap();
        let mut cart = cart();

        let la = cart.add_or_increment(None, &a, 1).unwrap();
        assert_consistent(&cart);
        let lb = cart.add_or_increment(None, &b, 7).unwrap();
        assert_consistent(&cart);
        let lc = cart.add_or_increment(None, &c, 2).unwrap();
        assert_consistent(&cart);
        cart.set_quantity(lb.id, 3, &b).unwrap();
        assert_consistent(&cart);
        cart.remove(la.id).unwrap();
        assert_consistent(&cart);
        cart.add_or_increment(None, &a, 4).unwrap();
        assert_consistent(&cart);
        cart.set_quantity(lc.id, 0, &c).unwrap();
        assert_consistent(&cart);

        assert_eq!(cart.total_products(), 7);
        assert_eq!(cart.final_price().to_string(), "2400.26");
    }

    #[test]
    fn test_line_ids_are_not_reused() {
        let a = product(1, "1.00");
        let b = product(2, "2.00");
        let mut cart = cart();

        let first = cart.add_or_increment(None, &a, 1).unwrap();
        cart.remove(first.id).unwrap();
        let second = cart.add_or_increment(None, &b, 1).unwrap();
        assert_ne!(first.id, second.id);

        // Incrementing an existing line keeps its id
        let again = cart.add_or_increment(None, &b, 1).unwrap();
        assert_eq!(again.id, second.id);
    }

    #[test]
    fn test_add_refreshes_unit_price() {
        let mut phone = product(1, "10.00");
        let mut cart = cart();
        cart.add_or_increment(None, &phone, 1).unwrap();

        phone.price = Price::parse("12.50").unwrap();
        let line = cart.add_or_increment(None, &phone, 1).unwrap();
        assert_eq!(line.unit_price.to_string(), "12.50");
        assert_eq!(line.final_price.to_string(), "25.00");
        assert_consistent(&cart);
    }

    #[test]
    fn test_set_quantity() {
        let phone = product(1, "3.33");
        let mut cart = cart();
        let line = cart.add_or_increment(None, &phone, 1).unwrap();

        let updated = cart.set_quantity(line.id, 3, &phone).unwrap().unwrap();
        assert_eq!(updated.quantity, 3);
        assert_eq!(updated.final_price.to_string(), "9.99");
        assert_eq!(cart.total_products(), 3);

        assert_eq!(cart.set_quantity(line.id, 0, &phone).unwrap(), None);
        assert!(cart.is_empty());
        assert_eq!(cart.final_price(), Price::ZERO);
    }

    #[test]
    fn test_set_quantity_rejects_other_product() {
        let a = product(1, "1.00");
        let b = product(2, "2.00");
        let mut cart = cart();
        let line = cart.add_or_increment(None, &a, 1).unwrap();
        assert!(matches!(
            cart.set_quantity(line.id, 2, &b),
            Err(ShopError::Validation { field: "product", .. })
        ));
    }

    #[test]
    fn test_unknown_line() {
        let phone = product(1, "1.00");
        let mut cart = cart();
        let missing = CartLineId::new(9);
        assert_eq!(cart.remove(missing).unwrap_err().kind(), "not_found");
        assert_eq!(
            cart.set_quantity(missing, 1, &phone).unwrap_err().kind(),
            "not_found"
        );
    }

    #[test]
    fn test_zero_quantity_add_is_rejected() {
        let phone = product(1, "1.00");
        let mut cart = cart();
        assert!(matches!(
            cart.add_or_increment(None, &phone, 0),
            Err(ShopError::Validation { field: "quantity", .. })
        ));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_overflow_leaves_cart_untouched() {
        let phone = product(1, "9999999.99");
        let mut cart = cart();
        cart.add_or_increment(None, &phone, 2).unwrap();
        let before = cart.clone();

        assert!(cart.add_or_increment(None, &phone, u32::MAX).is_err());
        assert_eq!(cart, before);
        assert_consistent(&cart);
    }

    #[test]
    fn test_checked_out_cart_rejects_every_mutation() {
        let phone = product(1, "5.00");
        let mut cart = cart();
        let line = cart.add_or_increment(None, &phone, 1).unwrap();
        cart.mark_in_order(CustomerId::new(1));
        let before = cart.clone();

        let errors = [
            cart.add_or_increment(None, &phone, 1).unwrap_err(),
            cart.set_quantity(line.id, 4, &phone).unwrap_err(),
            cart.set_quantity(line.id, 0, &phone).unwrap_err(),
            cart.remove(line.id).unwrap_err(),
            cart.clear().unwrap_err(),
        ];
        for err in errors {
            assert_eq!(err.kind(), "precondition");
        }
        assert_eq!(cart, before);
    }

    #[test]
    fn test_clear() {
        let mut cart = cart();
        cart.add_or_increment(None, &product(1, "1.00"), 1).unwrap();
        cart.add_or_increment(None, &product(2, "2.00"), 2).unwrap();
        cart.clear().unwrap();
        assert!(cart.is_empty());
        assert_consistent(&cart);
    }

    #[test]
    fn test_mark_in_order_adopts_anonymous_cart() {
        let mut cart = Cart::new(CartId::new(3), None);
        cart.mark_in_order(CustomerId::new(8));
        assert_eq!(cart.owner(), Some(CustomerId::new(8)));
        assert!(cart.for_anonymous_user());
        assert!(cart.in_order());
    }
}
