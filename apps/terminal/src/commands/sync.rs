//! Sync commands: inspect the offline queue and flush it by hand.

use serde::Serialize;

use kervy_core::{EntityType, QueuedWrite};
use kervy_sync::{FlushReport, OfflineWriteQueue, SyncFlusher};

use crate::error::AppResult;

/// Queued writes of one entity type, oldest first.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedEntity {
    pub entity_type: EntityType,
    pub writes: Vec<QueuedWrite>,
}

/// Everything waiting to be replayed, in flush order.
pub async fn queued_writes(queue: &OfflineWriteQueue) -> AppResult<Vec<QueuedEntity>> {
    let mut entities = Vec::with_capacity(EntityType::ALL.len());
    for entity_type in EntityType::ALL {
        entities.push(QueuedEntity {
            entity_type,
            writes: queue.drain(entity_type).await?,
        });
    }
    Ok(entities)
}

/// Replays the queue once.
pub async fn flush_queue(flusher: &SyncFlusher) -> AppResult<FlushReport> {
    Ok(flusher.flush_all().await?)
}
