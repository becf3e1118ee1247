//! # kervy-db: Local Persistence for Kervy POS
//!
//! Durable on-device storage. Everything the terminal must keep across a
//! restart while offline lives here as string values under a key.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kervy POS Local Data                             │
//! │                                                                         │
//! │  OfflineWriteQueue.enqueue(QueuedWrite)                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     kervy-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────────┐  ┌────────────┐  │   │
//! │  │   │   Database    │    │  LocalStorage      │  │ Migrations │  │   │
//! │  │   │   (pool.rs)   │◄───│  KeyValueRepository│  │ (embedded) │  │   │
//! │  │   │  SqlitePool   │    │  MemoryStorage     │  │            │  │   │
//! │  │   └───────────────┘    └────────────────────┘  └────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file in the platform data directory (kervy.db)                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kervy_db::{Database, DbConfig, LocalStorage};
//!
//! let db = Database::new(DbConfig::new("kervy.db")).await?;
//! let storage = db.local_storage();
//! storage.set("Categories", "[]").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
mod migrations;
pub mod pool;
pub mod repository;
pub mod storage;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::kv::KeyValueRepository;
pub use storage::{LocalStorage, MemoryStorage};
