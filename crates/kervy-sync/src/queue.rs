//! # Offline Write Queue
//!
//! Durable FIFO of create-operations buffered while the device is offline.
//!
//! ## Storage Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Local Storage (key → JSON)                         │
//! │                                                                         │
//! │  "Categories" → [ {entityType:"category", payload:{name,..,userId}},    │
//! │                   {entityType:"category", payload:{...}} ]              │
//! │                                                                         │
//! │  "Products"   → [ {entityType:"product",  payload:{name,priceCents,     │
//! │                    stock,categoryId,image,userId}} ]                    │
//! │                                                                         │
//! │  enqueue ──► read array ──► push ──► write array   (under one lock)    │
//! │  drain   ──► read array (non-destructive)                               │
//! │  remove_front(n) ──► drop acknowledged prefix, keep the tail            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every read-modify-write runs under a single async mutex, so an enqueue
//! racing a flush can neither be lost nor clobber the flusher's removal.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use kervy_core::{EntityType, QueuedWrite};
use kervy_db::LocalStorage;

use crate::error::{SyncError, SyncResult};

/// Durable per-entity-type queue of pending creates.
#[derive(Clone)]
pub struct OfflineWriteQueue {
    storage: Arc<dyn LocalStorage>,
    lock: Arc<Mutex<()>>,
}

impl OfflineWriteQueue {
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        OfflineWriteQueue {
            storage,
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Appends a write to the tail of its entity type's queue.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let write = QueuedWrite::Category(Owned::new(NewCategory::new("Drinks"), user_id));
    /// queue.enqueue(write).await?;
    /// ```
    pub async fn enqueue(&self, write: QueuedWrite) -> SyncResult<()> {
        let entity = write.entity_type();
        let _guard = self.lock.lock().await;

        let mut items = self.read(entity).await?;
        debug!(entity = %entity, name = %write.name(), position = items.len(), "Queueing offline write");
        items.push(write);
        self.write(entity, &items).await
    }

    /// Returns the queued writes for `entity` in insertion order.
    ///
    /// Nothing is removed; callers acknowledge with [`remove_front`](Self::remove_front).
    pub async fn drain(&self, entity: EntityType) -> SyncResult<Vec<QueuedWrite>> {
        let _guard = self.lock.lock().await;
        self.read(entity).await
    }

    /// Discards every queued write for `entity`.
    pub async fn clear(&self, entity: EntityType) -> SyncResult<()> {
        let _guard = self.lock.lock().await;
        debug!(entity = %entity, "Clearing offline queue");
        self.storage.remove(entity.storage_key()).await?;
        Ok(())
    }

    /// Drops the first `count` writes for `entity`, keeping anything queued
    /// after them (including writes enqueued since the last drain).
    pub async fn remove_front(&self, entity: EntityType, count: usize) -> SyncResult<()> {
        if count == 0 {
            return Ok(());
        }

        let _guard = self.lock.lock().await;
        let mut items = self.read(entity).await?;

        if count > items.len() {
            warn!(
                entity = %entity,
                count,
                queued = items.len(),
                "Asked to remove more writes than are queued"
            );
        }

        items.drain(..count.min(items.len()));

        if items.is_empty() {
            self.storage.remove(entity.storage_key()).await?;
            Ok(())
        } else {
            self.write(entity, &items).await
        }
    }

    /// Number of writes queued for `entity`.
    pub async fn len(&self, entity: EntityType) -> SyncResult<usize> {
        Ok(self.drain(entity).await?.len())
    }

    /// Total writes queued across every entity type.
    pub async fn pending(&self) -> SyncResult<usize> {
        let mut total = 0;
        for entity in EntityType::ALL {
            total += self.len(entity).await?;
        }
        Ok(total)
    }

    async fn read(&self, entity: EntityType) -> SyncResult<Vec<QueuedWrite>> {
        match self.storage.get(entity.storage_key()).await? {
            Some(raw) if !raw.trim().is_empty() => serde_json::from_str(&raw).map_err(|e| {
                SyncError::DeserializationFailed(format!(
                    "queue {} is corrupt: {}",
                    entity.storage_key(),
                    e
                ))
            }),
            _ => Ok(Vec::new()),
        }
    }

    async fn write(&self, entity: EntityType, items: &[QueuedWrite]) -> SyncResult<()> {
        let raw = serde_json::to_string(items)?;
        self.storage.set(entity.storage_key(), &raw).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kervy_core::{NewCategory, NewProduct, Owned};
    use kervy_db::MemoryStorage;

    fn category(name: &str) -> QueuedWrite {
        QueuedWrite::Category(Owned::new(NewCategory::new(name), "user-1"))
    }

    fn product(name: &str) -> QueuedWrite {
        QueuedWrite::Product(Owned::new(
            NewProduct {
                name: name.to_string(),
                description: String::new(),
                price_cents: 1500,
                stock: 4,
                category_id: "cat-1".to_string(),
                image: None,
            },
            "user-1",
        ))
    }

    fn queue() -> (OfflineWriteQueue, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        (OfflineWriteQueue::new(storage.clone()), storage)
    }

    #[tokio::test]
    async fn test_drain_empty_queue() {
        let (queue, _) = queue();
        assert!(queue.drain(EntityType::Category).await.unwrap().is_empty());
        assert_eq!(queue.pending().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_enqueue_preserves_order_per_type() {
        let (queue, _) = queue();

        queue.enqueue(category("Drinks")).await.unwrap();
        queue.enqueue(product("Iced Tea")).await.unwrap();
        queue.enqueue(category("Snacks")).await.unwrap();

        let categories = queue.drain(EntityType::Category).await.unwrap();
        let names: Vec<_> = categories.iter().map(|w| w.name()).collect();
        assert_eq!(names, vec!["Drinks", "Snacks"]);

        assert_eq!(queue.len(EntityType::Product).await.unwrap(), 1);
        assert_eq!(queue.pending().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_drain_is_not_destructive() {
        let (queue, _) = queue();
        queue.enqueue(category("Drinks")).await.unwrap();

        queue.drain(EntityType::Category).await.unwrap();
        assert_eq!(queue.len(EntityType::Category).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_remove_front_keeps_tail() {
        let (queue, storage) = queue();
        for name in ["A", "B", "C"] {
            queue.enqueue(category(name)).await.unwrap();
        }

        queue.remove_front(EntityType::Category, 1).await.unwrap();
        let names: Vec<_> = queue
            .drain(EntityType::Category)
            .await
            .unwrap()
            .iter()
            .map(|w| w.name().to_string())
            .collect();
        assert_eq!(names, vec!["B", "C"]);

        queue.remove_front(EntityType::Category, 5).await.unwrap();
        assert_eq!(storage.get("Categories").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_clear() {
        let (queue, storage) = queue();
        queue.enqueue(product("Turon")).await.unwrap();
        queue.clear(EntityType::Product).await.unwrap();
        assert_eq!(storage.get("Products").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_stored_format() {
        let (queue, storage) = queue();
        queue.enqueue(category("Drinks")).await.unwrap();

        let raw = storage.get("Categories").await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value[0]["entityType"], "category");
        assert_eq!(value[0]["payload"]["userId"], "user-1");
    }

    #[tokio::test]
    async fn test_corrupt_queue_is_reported() {
        let (queue, storage) = queue();
        storage.set("Products", "{not json").await.unwrap();

        let err = queue.drain(EntityType::Product).await.unwrap_err();
        assert!(matches!(err, SyncError::DeserializationFailed(_)));
    }
}
