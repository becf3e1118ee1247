//! # Commands Module
//!
//! Operations that span several state objects.
//!
//! ## Command Categories
//! - [`checkout`] - Checkout with receipt, kitchen tickets
//! - [`sync`] - Offline queue inspection and manual flush
//!
//! Single-store operations (adding a category, fetching products) are
//! called on the state objects directly.

pub mod checkout;
pub mod sync;
