//! # kervy-core: Pure Business Logic for Kervy POS
//!
//! This crate holds the records, money math and cart rules shared by every
//! other crate in the workspace. It has zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kervy POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 apps/terminal (state objects + CLI)             │   │
//! │  │    CategoryStore ─ ProductStore ─ CartState ─ TransactionStore  │   │
//! │  └─────────────┬──────────────────────────────┬────────────────────┘   │
//! │                │                              │                        │
//! │  ┌─────────────▼──────────────┐  ┌────────────▼───────────────────┐    │
//! │  │ kervy-sync                 │  │ kervy-print                    │    │
//! │  │ queue · flusher · Firestore│  │ receipt · kitchen ticket       │    │
//! │  └─────────────┬──────────────┘  └────────────┬───────────────────┘    │
//! │                │                              │                        │
//! │  ┌─────────────▼──────────────────────────────▼───────────────────┐   │
//! │  │               ★ kervy-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   cart    │  │ validation│  │   │
//! │  │   │ Category  │  │   Money   │  │   Cart    │  │   rules   │  │   │
//! │  │   │  Product  │  │           │  │ checkout  │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO STORAGE • NO NETWORK • PURE FUNCTIONS            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Records (Category, Product, Transaction, UserProfile) and queued writes
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`cart`] - Shopping cart and checkout math
//! - [`error`] - Domain error types
//! - [`validation`] - Write-boundary validation
//!
//! ## Example Usage
//!
//! ```rust
//! use kervy_core::money::Money;
//!
//! let price = Money::from_cents(4550);
//! let line = price.multiply_quantity(2);
//! assert_eq!(line.cents(), 9100);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{next_transaction_number, Cart, CartItem, CartTotals, CheckoutSummary};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines allowed in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line in the cart.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Object-store folder that product images are uploaded into.
pub const IMAGE_FOLDER: &str = "pos-kervy";
