//! # Cart & Checkout
//!
//! The shopping cart and the checkout math that turns it into a
//! [`NewTransaction`].
//!
//! ## Line Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  Tap product ────────► add_item(product, 1) ──► qty += 1 or new line   │
//! │  Tap minus ──────────► reduce_quantity(id) ───► qty -= 1, gone at 0    │
//! │  Swipe away ─────────► remove_item(id) ───────► line removed           │
//! │  Sale done ──────────► clear() ───────────────► empty cart             │
//! │                                                                         │
//! │  Checkout:                                                              │
//! │  cart + cash ──► CheckoutSummary { total, cash, change }               │
//! │              ──► into_transaction(number, customer, now)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{NewTransaction, Product, TransactionLine};
use crate::validation::{validate_cash_cents, validate_quantity};
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

// =============================================================================
// Cart Item
// =============================================================================

/// A line in the shopping cart.
///
/// Name and price are frozen when the product is added, so a catalog edit
/// mid-sale does not change what the customer is charged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: String,
    pub name: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    pub fn from_product(product: &Product, quantity: i64) -> Self {
        CartItem {
            product_id: product.id.clone(),
            name: product.name.clone(),
            unit_price_cents: product.price_cents,
            quantity,
            added_at: Utc::now(),
        }
    }

    /// Unit price × quantity.
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.unit_price_cents).multiply_quantity(self.quantity)
    }
}

impl From<&CartItem> for TransactionLine {
    fn from(item: &CartItem) -> Self {
        TransactionLine {
            id: item.product_id.clone(),
            name: item.name.clone(),
            price_cents: item.unit_price_cents,
            quantity: item.quantity,
        }
    }
}

// =============================================================================
// Cart
// =============================================================================

/// Lines being rung up for the current customer.
///
/// ## Invariants
/// - Lines are unique by `product_id` (adding the same product bumps quantity)
/// - Every quantity is > 0; a line reduced to zero is removed
/// - At most [`MAX_CART_ITEMS`] lines, at most [`MAX_ITEM_QUANTITY`] per line
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub items: Vec<CartItem>,
    pub created_at: DateTime<Utc>,
}

impl Cart {
    pub fn new() -> Self {
        Cart {
            items: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Adds a product or increases its quantity if already present.
    pub fn add_item(&mut self, product: &Product, quantity: i64) -> CoreResult<()> {
        validate_quantity(quantity)?;

        if let Some(item) = self.items.iter_mut().find(|i| i.product_id == product.id) {
            let new_qty = item.quantity + quantity;
            if new_qty > MAX_ITEM_QUANTITY {
                return Err(CoreError::QuantityTooLarge {
                    requested: new_qty,
                    max: MAX_ITEM_QUANTITY,
                });
            }
            item.quantity = new_qty;
            return Ok(());
        }

        if self.items.len() >= MAX_CART_ITEMS {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_ITEMS,
            });
        }

        self.items.push(CartItem::from_product(product, quantity));
        Ok(())
    }

    /// Decrements a line by one, removing it when it reaches zero.
    pub fn reduce_quantity(&mut self, product_id: &str) -> CoreResult<()> {
        let index = self
            .items
            .iter()
            .position(|i| i.product_id == product_id)
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

        if self.items[index].quantity <= 1 {
            self.items.remove(index);
        } else {
            self.items[index].quantity -= 1;
        }
        Ok(())
    }

    /// Removes a line by product ID.
    pub fn remove_item(&mut self, product_id: &str) -> CoreResult<()> {
        let initial_len = self.items.len();
        self.items.retain(|i| i.product_id != product_id);

        if self.items.len() == initial_len {
            Err(CoreError::ProductNotFound(product_id.to_string()))
        } else {
            Ok(())
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.created_at = Utc::now();
    }

    /// Number of distinct lines.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Sum of all line quantities.
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Σ quantity × unit price.
    pub fn total(&self) -> Money {
        self.items.iter().map(CartItem::line_total).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Lines as recorded on a transaction.
    pub fn lines(&self) -> Vec<TransactionLine> {
        self.items.iter().map(TransactionLine::from).collect()
    }
}

impl Default for Cart {
    fn default() -> Self {
        Self::new()
    }
}

/// Cart totals summary for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub item_count: usize,
    pub total_quantity: i64,
    pub total_cents: i64,
}

impl From<&Cart> for CartTotals {
    fn from(cart: &Cart) -> Self {
        CartTotals {
            item_count: cart.item_count(),
            total_quantity: cart.total_quantity(),
            total_cents: cart.total().cents(),
        }
    }
}

// =============================================================================
// Checkout
// =============================================================================

/// Total, tendered cash and change for a checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckoutSummary {
    pub total: Money,
    pub cash: Money,
    pub change: Money,
}

impl CheckoutSummary {
    /// Computes `change = cash − total`.
    ///
    /// ## Errors
    /// - [`CoreError::EmptyCart`] when there is nothing to sell
    /// - [`CoreError::InsufficientCash`] when cash does not cover the total
    ///
    /// ## Example
    /// ```rust
    /// use kervy_core::{Cart, CheckoutSummary, Money, Product};
    ///
    /// let mut cart = Cart::new();
    /// let product = Product {
    ///     id: "p1".into(), name: "Iced Tea".into(), description: String::new(),
    ///     price_cents: 4500, stock: 10, category_id: "c1".into(),
    ///     image: None, user_id: None,
    /// };
    /// cart.add_item(&product, 2).unwrap();
    ///
    /// let summary = CheckoutSummary::compute(&cart, Money::from_cents(10000)).unwrap();
    /// assert_eq!(summary.change.cents(), 1000);
    /// ```
    pub fn compute(cart: &Cart, cash: Money) -> CoreResult<Self> {
        if cart.is_empty() {
            return Err(CoreError::EmptyCart);
        }
        validate_cash_cents(cash.cents())?;

        let total = cart.total();
        if cash < total {
            return Err(CoreError::InsufficientCash {
                cash_cents: cash.cents(),
                total_cents: total.cents(),
            });
        }

        Ok(CheckoutSummary {
            total,
            cash,
            change: cash - total,
        })
    }

    /// Builds the transaction record for this checkout.
    pub fn into_transaction(
        self,
        cart: &Cart,
        number: u64,
        customer: Option<String>,
        date: DateTime<Utc>,
    ) -> NewTransaction {
        NewTransaction {
            number,
            date,
            total_cents: self.total.cents(),
            cash_cents: self.cash.cents(),
            change_cents: self.change.cents(),
            customer: customer
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            products: cart.lines(),
        }
    }
}

/// Next transaction number: one past the latest, or 1 for the first sale.
pub fn next_transaction_number(latest: Option<u64>) -> u64 {
    latest.map_or(1, |n| n + 1)
}

// =============================================================================
// Unit Tests
// =============================================================================
