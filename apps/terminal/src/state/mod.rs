//! # State Module
//!
//! Owned state objects for the terminal. Each one is built from the
//! collaborators it needs and is cheap to clone (shared `Arc` internals).
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌──────────────┐                                                       │
//! │  │ SessionState │◄──────── user id / profile ───────────┐               │
//! │  └──────┬───────┘                                       │               │
//! │         │ token                                         │               │
//! │         ▼                                               │               │
//! │  ┌──────────────┐  ┌──────────────┐  ┌─────────────────┴──┐            │
//! │  │CategoryStore │  │ ProductStore │  │ TransactionStore   │            │
//! │  │ remote/queue │  │ remote/images│  │ remote             │            │
//! │  └──────────────┘  │ queue        │  └────────────────────┘            │
//! │                    └──────────────┘                                     │
//! │  ┌──────────────┐  ┌──────────────┐                                     │
//! │  │  CartState   │  │ ConfigState  │                                     │
//! │  │ Arc<Mutex<>> │  │ read-only    │                                     │
//! │  └──────────────┘  └──────────────┘                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod cart;
mod categories;
mod config;
mod products;
mod session;
mod transactions;

pub use cart::CartState;
pub use categories::CategoryStore;
pub use config::ConfigState;
pub use products::ProductStore;
pub use session::SessionState;
pub use transactions::TransactionStore;

use serde::Serialize;

/// Where a create landed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "status", content = "id")]
pub enum WriteOutcome {
    /// Written to the remote store under this id.
    Saved(String),
    /// Offline; queued on this device until the connection returns.
    Queued,
}
