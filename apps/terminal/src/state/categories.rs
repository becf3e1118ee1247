//! # Category Store
//!
//! The signed-in user's categories.
//!
//! ## Write Paths
//! ```text
//! add(input)
//!    │ validate
//!    ├── online ──► Categories.create ──► fetch() ──► WriteOutcome::Saved(id)
//!    └── offline ─► queue.enqueue(Category) ───────► WriteOutcome::Queued
//!
//! update / delete ── online only, otherwise "No internet connection"
//! delete(id) ─────── one batch: every product in the category + the category
//! ```

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use kervy_core::{Category, CategoryUpdate, Collection, NewCategory, Owned, Product, QueuedWrite};
use kervy_sync::remote::to_fields;
use kervy_sync::{
    BatchWrite, ConnectivityMonitor, OfflineWriteQueue, Query, RemoteStore, SyncError,
};

use super::session::SessionState;
use super::WriteOutcome;
use crate::error::AppResult;

/// Cached categories plus their write operations.
#[derive(Clone)]
pub struct CategoryStore {
    remote: Arc<dyn RemoteStore>,
    queue: OfflineWriteQueue,
    monitor: ConnectivityMonitor,
    session: SessionState,
    categories: Arc<RwLock<Vec<Category>>>,
}

impl CategoryStore {
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        queue: OfflineWriteQueue,
        monitor: ConnectivityMonitor,
        session: SessionState,
    ) -> Self {
        CategoryStore {
            remote,
            queue,
            monitor,
            session,
            categories: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Last fetched categories.
    pub async fn list(&self) -> Vec<Category> {
        self.categories.read().await.clone()
    }

    /// Loads the user's categories from the remote store.
    pub async fn fetch(&self) -> AppResult<Vec<Category>> {
        let user_id = self.session.user_id().await?;
        let query = Query::new().where_eq("userId", user_id.as_str());

        let categories = self
            .remote
            .query(Collection::Categories, &query)
            .await?
            .iter()
            .map(|doc| doc.decode::<Category>())
            .collect::<Result<Vec<_>, _>>()?;

        *self.categories.write().await = categories.clone();
        Ok(categories)
    }

    /// Creates a category, or queues it when offline.
    pub async fn add(&self, input: NewCategory) -> AppResult<WriteOutcome> {
        input.validate()?;
        let user_id = self.session.user_id().await?;
        let owned = Owned::new(input, user_id);

        if !self.monitor.is_connected() {
            let name = owned.record.name.clone();
            self.queue
                .enqueue(QueuedWrite::Category(owned))
                .await
                .inspect_err(|e| warn!(error = %e, name = %name, "Could not queue category"))?;
            info!(name = %name, "Offline, category queued");
            return Ok(WriteOutcome::Queued);
        }

        let id = self
            .remote
            .create(Collection::Categories, to_fields(&owned)?)
            .await?;
        info!(id = %id, name = %owned.record.name, "Category created");

        if let Err(e) = self.fetch().await {
            warn!(error = %e, "Category saved but the list could not be refreshed");
        }
        Ok(WriteOutcome::Saved(id))
    }

    /// Renames or re-describes a category.
    pub async fn update(&self, id: &str, update: CategoryUpdate) -> AppResult<()> {
        update.validate()?;
        self.require_online()?;

        self.remote
            .update(Collection::Categories, id, update.into_fields())
            .await?;
        self.fetch().await?;
        Ok(())
    }

    /// Deletes a category together with every product filed under it.
    pub async fn delete(&self, id: &str) -> AppResult<usize> {
        self.require_online()?;

        let products = self.products_in(id).await?;
        let mut writes: Vec<BatchWrite> = products
            .iter()
            .map(|p| BatchWrite::Delete {
                collection: Collection::Inventory,
                id: p.id.clone(),
            })
            .collect();
        writes.push(BatchWrite::Delete {
            collection: Collection::Categories,
            id: id.to_string(),
        });

        self.remote.commit(writes).await?;
        info!(id = %id, products = products.len(), "Category deleted");

        self.categories.write().await.retain(|c| c.id != id);
        Ok(products.len())
    }

    /// Products of the signed-in user filed under `category_id`.
    pub async fn products_in(&self, category_id: &str) -> AppResult<Vec<Product>> {
        let user_id = self.session.user_id().await?;
        let query = Query::new()
            .where_eq("userId", user_id.as_str())
            .where_eq("categoryId", category_id);

        let products = self
            .remote
            .query(Collection::Inventory, &query)
            .await?
            .iter()
            .map(|doc| doc.decode::<Product>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(products)
    }

    fn require_online(&self) -> AppResult<()> {
        if self.monitor.is_connected() {
            Ok(())
        } else {
            Err(SyncError::Offline.into())
        }
    }
}
