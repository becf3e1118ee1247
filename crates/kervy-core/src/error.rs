//! # Error Types
//!
//! Failures of the selling rules and of input checks at the write boundary.
//!
//! ```text
//! ValidationError ──► CoreError::Validation ──► AppError (VALIDATION_ERROR)
//! CoreError (cart, stock, cash)             ──► AppError (CART_ERROR, INSUFFICIENT_STOCK, PAYMENT_ERROR)
//! ```
//!
//! Messages are shown to the operator as-is, so they name the product or
//! field involved.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Product is not in the catalog or the cart.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Selling the requested quantity would take stock below zero.
    ///
    /// ```text
    /// cart: Puto x3 ──► stock read: 1 ──► InsufficientStock { "Puto", 1, 3 }
    ///                                     nothing is written
    /// ```
    #[error("Not enough stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    #[error("A sale can hold at most {max} different products")]
    CartTooLarge { max: usize },

    #[error("Cannot sell {requested} of one product at once (limit {max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    #[error("Cart is empty")]
    EmptyCart,

    /// Cash tendered is below the total; amounts in centavos.
    #[error("Cash {cash_cents} does not cover total {total_cents}")]
    InsufficientCash { cash_cents: i64, total_cents: i64 },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// A field rejected before anything is queued or written.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} is longer than {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be from {min} to {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Zero or negative where only positive amounts make sense (price, cash).
    #[error("{field} must be greater than zero")]
    MustBePositive { field: String },

    #[error("{field} is not valid: {reason}")]
    InvalidFormat { field: String, reason: String },
}

pub type CoreResult<T> = Result<T, CoreError>;
