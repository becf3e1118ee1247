//! # kervy-sync: Offline Write Sync for Kervy POS
//!
//! Category and product creates made without a connection are queued on the
//! device and replayed against the cloud store as soon as the connection
//! comes back.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sync Layer Architecture                          │
//! │                                                                         │
//! │  CategoryStore / ProductStore (terminal)                                │
//! │        │ online?                                                        │
//! │        ├── yes ──► RemoteStore.create                                   │
//! │        └── no  ──► OfflineWriteQueue.enqueue ──► LocalStorage (SQLite)  │
//! │                                                                         │
//! │  ┌──────────────────────┐   false → true   ┌────────────────────────┐  │
//! │  │ ConnectivityMonitor  │ ───────────────► │ SyncAgent              │  │
//! │  │ (TCP probe, events)  │                  │   └─► SyncFlusher      │  │
//! │  └──────────────────────┘                  │        drain → upload  │  │
//! │                                            │        → create        │  │
//! │                                            │        → remove_front  │  │
//! │                                            └───────────┬────────────┘  │
//! │                                                        ▼               │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │ remote: FirestoreClient · FirebaseImageStore · FirebaseAuth      │   │
//! │  │         (in-memory twins for tests)                              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//! - [`agent`] - `SyncAgent`, flush on reconnect
//! - [`auth`] - Email/password accounts
//! - [`config`] - Sync configuration (device, Firebase, probe, storage)
//! - [`connectivity`] - Reachability state and probing
//! - [`error`] - Sync error types
//! - [`flusher`] - Queue replay
//! - [`queue`] - Durable offline write queue
//! - [`remote`] - Remote store and image store contracts and clients
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kervy_sync::{ConnectivityMonitor, OfflineWriteQueue, SyncAgentBuilder, SyncConfig, SyncFlusher};
//!
//! let config = SyncConfig::load_or_default(None);
//! let queue = OfflineWriteQueue::new(Arc::new(db.local_storage()));
//! let flusher = Arc::new(SyncFlusher::new(queue, remote, images));
//!
//! let mut agent = SyncAgentBuilder::new(config)
//!     .with_flusher(flusher)
//!     .with_monitor(monitor)
//!     .build()?;
//! let handle = agent.start().await?;
//! println!("Pending: {}", handle.status().await.pending);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod agent;
pub mod auth;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod flusher;
pub mod queue;
pub mod remote;
pub mod token;

// =============================================================================
// Re-exports
// =============================================================================

pub use agent::{NoOpEmitter, SyncAgent, SyncAgentBuilder, SyncAgentHandle, SyncEventEmitter, SyncStatus};
pub use auth::{AuthProvider, AuthSession, FirebaseAuth, MemoryAuth, RefreshedToken};
pub use config::SyncConfig;
pub use connectivity::{ConnectivityMonitor, ReachabilityProbe, TcpProbe};
pub use error::{SyncError, SyncResult};
pub use flusher::{EntityFlush, FlushReport, SyncFlusher};
pub use queue::OfflineWriteQueue;
pub use remote::{
    BatchWrite, Direction, Document, ImageStore, MemoryImageStore, MemoryRemoteStore, Query,
    RemoteStore, TokenCell,
};
