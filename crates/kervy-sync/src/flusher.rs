//! # Sync Flusher
//!
//! Replays queued offline writes against the remote store.
//!
//! ## Flush Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         flush_all()                                     │
//! │                                                                         │
//! │  flush_lock ── one flush at a time; a second caller waits its turn      │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  for entity in [Category, Product]:                                     │
//! │      items = queue.drain(entity)                                        │
//! │      for item in items (FIFO):                                          │
//! │          product with local image? ──► ImageStore.upload ──► URL        │
//! │          RemoteStore.create(collection, record + userId)                │
//! │          ├── Ok  ──► replayed += 1                                      │
//! │          └── Err ──► stop                                               │
//! │      queue.remove_front(entity, replayed)    (tail stays queued)        │
//! │      stopped? ──► skip the remaining entity types                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Delivery Guarantee
//! At-least-once. Acknowledged writes are removed from local storage only
//! after the remote create succeeded; if that removal fails, the same item is
//! replayed on the next flush and the remote store ends up with a duplicate.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use kervy_core::{EntityType, Owned, QueuedWrite};

use crate::error::SyncResult;
use crate::queue::OfflineWriteQueue;
use crate::remote::{host_image, to_fields, ImageStore, RemoteStore};

// =============================================================================
// Flush Report
// =============================================================================

/// Outcome of one entity type's replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityFlush {
    /// Writes created remotely and removed from the queue.
    pub replayed: usize,
    /// Writes still queued after the flush.
    pub retained: usize,
}

/// Outcome of a [`SyncFlusher::flush_all`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct FlushReport {
    pub categories: EntityFlush,
    pub products: EntityFlush,
    /// First failure, if the flush stopped early.
    pub error: Option<String>,
    pub finished_at: DateTime<Utc>,
}

impl Default for FlushReport {
    fn default() -> Self {
        FlushReport {
            categories: EntityFlush::default(),
            products: EntityFlush::default(),
            error: None,
            finished_at: Utc::now(),
        }
    }
}

impl FlushReport {
    pub fn for_entity(&self, entity: EntityType) -> EntityFlush {
        match entity {
            EntityType::Category => self.categories,
            EntityType::Product => self.products,
        }
    }

    fn entity_mut(&mut self, entity: EntityType) -> &mut EntityFlush {
        match entity {
            EntityType::Category => &mut self.categories,
            EntityType::Product => &mut self.products,
        }
    }

    pub fn replayed(&self) -> usize {
        self.categories.replayed + self.products.replayed
    }

    pub fn retained(&self) -> usize {
        self.categories.retained + self.products.retained
    }

    /// True when every queued write was replayed.
    pub fn is_complete(&self) -> bool {
        self.error.is_none() && self.retained() == 0
    }
}

// =============================================================================
// Sync Flusher
// =============================================================================

/// Replays the offline queue.
pub struct SyncFlusher {
    queue: OfflineWriteQueue,
    remote: Arc<dyn RemoteStore>,
    images: Arc<dyn ImageStore>,
    flush_lock: Mutex<()>,
}

impl SyncFlusher {
    pub fn new(
        queue: OfflineWriteQueue,
        remote: Arc<dyn RemoteStore>,
        images: Arc<dyn ImageStore>,
    ) -> Self {
        SyncFlusher {
            queue,
            remote,
            images,
            flush_lock: Mutex::new(()),
        }
    }

    pub fn queue(&self) -> &OfflineWriteQueue {
        &self.queue
    }

    /// Replays every queued write, categories first.
    ///
    /// Remote failures do not make this return `Err`: they stop the flush and
    /// are recorded in [`FlushReport::error`], with the failed write and
    /// everything after it left queued. `Err` means local storage could not
    /// be read.
    pub async fn flush_all(&self) -> SyncResult<FlushReport> {
        let _guard = self.flush_lock.lock().await;
        let mut report = FlushReport::default();

        for entity in EntityType::ALL {
            let items = self.queue.drain(entity).await?;

            if report.error.is_some() {
                report.entity_mut(entity).retained = items.len();
                continue;
            }

            if items.is_empty() {
                continue;
            }

            info!(entity = %entity, count = items.len(), "Replaying offline writes");

            let mut replayed = 0;
            for item in &items {
                match self.replay(item).await {
                    Ok(id) => {
                        debug!(entity = %entity, name = %item.name(), id = %id, "Replayed offline write");
                        replayed += 1;
                    }
                    Err(e) => {
                        warn!(
                            entity = %entity,
                            name = %item.name(),
                            error = %e,
                            "Replay failed; keeping the rest queued"
                        );
                        report.error = Some(e.to_string());
                        break;
                    }
                }
            }

            if let Err(e) = self.queue.remove_front(entity, replayed).await {
                warn!(
                    entity = %entity,
                    replayed,
                    error = %e,
                    "Could not remove replayed writes; they will be replayed again"
                );
                report.error.get_or_insert_with(|| e.to_string());
                report.entity_mut(entity).retained = items.len();
                report.entity_mut(entity).replayed = replayed;
                continue;
            }

            let summary = report.entity_mut(entity);
            summary.replayed = replayed;
            summary.retained = items.len() - replayed;
        }

        report.finished_at = Utc::now();
        info!(
            replayed = report.replayed(),
            retained = report.retained(),
            failed = report.error.is_some(),
            "Flush finished"
        );
        Ok(report)
    }

    async fn replay(&self, write: &QueuedWrite) -> SyncResult<String> {
        let entity = write.entity_type();
        let fields = match write {
            QueuedWrite::Category(owned) => to_fields(owned)?,
            QueuedWrite::Product(owned) => {
                let image_url = host_image(self.images.as_ref(), owned.record.image.as_ref()).await?;
                let record = owned.record.clone().into_record(image_url);
                to_fields(&Owned::new(record, owned.user_id.clone()))?
            }
        };

        self.remote.create(entity.collection(), fields).await
    }
}
