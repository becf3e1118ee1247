//! # Kervy Terminal Library
//!
//! The application layer of Kervy POS: state objects, checkout, and the
//! wiring between local storage, the cloud services and the printer.
//!
//! ## Module Organization
//! ```text
//! kervy_terminal_lib/
//! ├── lib.rs          ◄─── You are here (tracing setup)
//! ├── context.rs      ◄─── AppContext: builds collaborators and state
//! ├── state/
//! │   ├── session.rs       SessionState (sign-in, profile)
//! │   ├── categories.rs    CategoryStore (queue when offline)
//! │   ├── products.rs      ProductStore (queue when offline, image upload)
//! │   ├── cart.rs          CartState
//! │   ├── transactions.rs  TransactionStore (sale + stock batch)
//! │   └── config.rs        ConfigState
//! ├── commands/
//! │   ├── checkout.rs      checkout, send_to_kitchen
//! │   └── sync.rs          queue listing, manual flush
//! └── error.rs        ◄─── AppError for every operation
//! ```
//!
//! ## Write Path While Offline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  categories.add(...)  ── monitor offline ──► OfflineWriteQueue (SQLite) │
//! │                                                      │                  │
//! │  probe sees the network ──► monitor true ──► SyncAgent ──► flush_all    │
//! │                                                      │                  │
//! │                                                      ▼                  │
//! │                                            Categories.create (remote)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod commands;
pub mod context;
pub mod error;
pub mod state;

use tracing_subscriber::EnvFilter;

pub use context::{AppContext, Collaborators};
pub use error::{AppError, AppResult, ErrorCode};

/// Installs the tracing subscriber, writing to stderr so command output on
/// stdout stays machine-readable.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=kervy_sync=trace` - Trace the sync layer only
/// - Default: `info,kervy=debug,sqlx=warn`
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,kervy=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
