//! # Cart State
//!
//! The cart being rung up on this terminal.
//!
//! ## Thread Safety
//! The cart is wrapped in `Arc<Mutex<T>>`: checkout and the operator's
//! edits can run on different tasks, and only one of them may change it at
//! a time. The lock is never held across an `.await`.
//!
//! ```text
//! add(product) ─────► quantity + 1, or a new line at 1
//! reduce(id) ───────► quantity − 1, line removed at 0
//! remove(id) ───────► line removed
//! clear() ──────────► empty cart
//! ```

use std::sync::{Arc, Mutex, MutexGuard};

use kervy_core::{Cart, CartTotals, CoreResult, Product};

/// Shared handle to the current cart.
#[derive(Debug, Clone, Default)]
pub struct CartState {
    cart: Arc<Mutex<Cart>>,
}

impl CartState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` with read access to the cart.
    pub fn with_cart<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Cart) -> R,
    {
        f(&self.lock())
    }

    /// Runs `f` with write access to the cart.
    pub fn with_cart_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Cart) -> R,
    {
        f(&mut self.lock())
    }

    pub fn add(&self, product: &Product) -> CoreResult<()> {
        self.with_cart_mut(|cart| cart.add_item(product, 1))
    }

    pub fn reduce(&self, product_id: &str) -> CoreResult<()> {
        self.with_cart_mut(|cart| cart.reduce_quantity(product_id))
    }

    pub fn remove(&self, product_id: &str) -> CoreResult<()> {
        self.with_cart_mut(|cart| cart.remove_item(product_id))
    }

    pub fn clear(&self) {
        self.with_cart_mut(Cart::clear)
    }

    pub fn totals(&self) -> CartTotals {
        self.with_cart(|cart| CartTotals::from(cart))
    }

    /// Copy of the cart as it is right now.
    pub fn snapshot(&self) -> Cart {
        self.with_cart(Cart::clone)
    }

    fn lock(&self) -> MutexGuard<'_, Cart> {
        self.cart.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, price_cents: i64) -> Product {
        Product {
            id: id.to_string(),
            name: format!("Product {}", id),
            description: String::new(),
            price_cents,
            stock: 10,
            category_id: "c-1".to_string(),
            image: None,
            user_id: Some("user-1".to_string()),
        }
    }

    #[test]
    fn test_add_twice_increments_quantity() {
        let cart = CartState::new();
        let puto = product("1", 1200);

        cart.add(&puto).unwrap();
        cart.add(&puto).unwrap();

        let totals = cart.totals();
        assert_eq!(totals.item_count, 1);
        assert_eq!(totals.total_quantity, 2);
        assert_eq!(totals.total_cents, 2400);
    }

    #[test]
    fn test_reduce_removes_at_zero() {
        let cart = CartState::new();
        cart.add(&product("1", 1200)).unwrap();
        cart.add(&product("2", 4500)).unwrap();
        cart.add(&product("2", 4500)).unwrap();

        cart.reduce("2").unwrap();
        cart.reduce("1").unwrap();

        let snapshot = cart.snapshot();
        assert_eq!(snapshot.items.len(), 1);
        assert_eq!(snapshot.items[0].product_id, "2");
        assert_eq!(snapshot.items[0].quantity, 1);
    }

    #[test]
    fn test_remove_and_clear() {
        let cart = CartState::new();
        cart.add(&product("1", 1200)).unwrap();
        cart.add(&product("2", 4500)).unwrap();

        cart.remove("1").unwrap();
        assert!(cart.remove("1").is_err());
        assert_eq!(cart.totals().item_count, 1);

        cart.clear();
        assert!(cart.with_cart(Cart::is_empty));
    }

    #[test]
    fn test_clones_share_the_cart() {
        let cart = CartState::new();
        let other = cart.clone();
        other.add(&product("1", 1200)).unwrap();
        assert_eq!(cart.totals().item_count, 1);
    }
}
