//! # Local Database
//!
//! Opens the SQLite file that holds the terminal's offline queue.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DbConfig::new(sync_config.database_path())                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await                                            │
//! │       ├── mkdir -p <parent>                                             │
//! │       ├── open (WAL, busy timeout)                                      │
//! │       └── migrate  (migrations/sqlite)                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  db.local_storage() ──► KeyValueRepository ──► OfflineWriteQueue        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  db.close().await  (on exit)                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The queue is written by the flusher and read by the CLI at the same
//! time, so the file runs in WAL mode and waits on a busy lock instead of
//! failing.

use std::path::{Path, PathBuf};
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::kv::KeyValueRepository;

// =============================================================================
// Configuration
// =============================================================================

/// Where the local database lives and how it is opened.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file; `None` keeps everything in memory.
    pub path: Option<PathBuf>,

    /// Connections in the pool. Default: 2 (one flusher, one reader).
    pub max_connections: u32,

    /// How long a write waits on a locked file. Default: 5 seconds.
    pub busy_timeout: Duration,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            path: Some(path.into()),
            max_connections: 2,
            busy_timeout: Duration::from_secs(5),
        }
    }

    /// A private in-memory database, gone when the pool closes.
    pub fn in_memory() -> Self {
        DbConfig {
            path: None,
            // Every connection to :memory: would see its own empty database.
            max_connections: 1,
            busy_timeout: Duration::from_secs(1),
        }
    }

    fn connect_options(&self) -> SqliteConnectOptions {
        let options = match &self.path {
            Some(path) => SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal),
            None => SqliteConnectOptions::new().in_memory(true),
        };
        options.foreign_keys(true).busy_timeout(self.busy_timeout)
    }
}

fn ensure_parent_dir(path: &Path) -> DbResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
            debug!(dir = %parent.display(), "Creating database directory");
            std::fs::create_dir_all(parent).map_err(|e| {
                DbError::ConnectionFailed(format!("cannot create {}: {}", parent.display(), e))
            })
        }
        _ => Ok(()),
    }
}

// =============================================================================
// Database
// =============================================================================

/// Handle to the local database.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (creating if needed) and migrates the database.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        match &config.path {
            Some(path) => {
                info!(path = %path.display(), "Opening local database");
                ensure_parent_dir(path)?;
            }
            None => info!("Opening in-memory database"),
        }

        // Keep the single in-memory connection alive for the pool's lifetime.
        let idle_timeout = config.path.as_ref().map(|_| Duration::from_secs(600));
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(1)
            .idle_timeout(idle_timeout)
            .connect_with(config.connect_options())
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        migrations::run_migrations(&pool).await?;
        Ok(Database { pool })
    }

    /// Key-value storage backing the offline queue.
    pub fn local_storage(&self) -> KeyValueRepository {
        KeyValueRepository::new(self.pool.clone())
    }

    pub async fn close(&self) {
        info!("Closing local database");
        self.pool.close().await;
    }
}
