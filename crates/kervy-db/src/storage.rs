//! # Local Storage Contract
//!
//! The `get` / `set` / `remove` string store the offline queue is built on.
//!
//! ```text
//! ┌──────────────────────┐      ┌──────────────────────────────────┐
//! │  OfflineWriteQueue   │─────►│  dyn LocalStorage                │
//! │  (kervy-sync)        │      │  ├── KeyValueRepository (SQLite) │
//! └──────────────────────┘      │  └── MemoryStorage (tests)       │
//!                               └──────────────────────────────────┘
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::DbResult;

/// Durable key-value storage of string values.
#[async_trait]
pub trait LocalStorage: Send + Sync {
    /// Returns the value stored under `key`, if any.
    async fn get(&self, key: &str) -> DbResult<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> DbResult<()>;

    /// Removes `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> DbResult<()>;
}

/// Process-local storage, lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LocalStorage for MemoryStorage {
    async fn get(&self, key: &str) -> DbResult<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> DbResult<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> DbResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}
