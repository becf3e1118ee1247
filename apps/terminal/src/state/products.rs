//! # Product Store
//!
//! The signed-in user's inventory (`Inventory` collection).
//!
//! ## Add Flow
//! ```text
//! add(input)
//!    │ validate
//!    ├── online ──► host_image (upload local photo) ──► Inventory.create ──► fetch()
//!    └── offline ─► queue.enqueue(Product)   (image uploaded at flush time)
//! ```

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use kervy_core::{Collection, NewProduct, Owned, Product, ProductUpdate, QueuedWrite};
use kervy_sync::remote::{host_image, to_fields};
use kervy_sync::{ConnectivityMonitor, ImageStore, OfflineWriteQueue, Query, RemoteStore, SyncError};

use super::session::SessionState;
use super::WriteOutcome;
use crate::error::{AppError, AppResult};

/// Cached products plus their write operations.
#[derive(Clone)]
pub struct ProductStore {
    remote: Arc<dyn RemoteStore>,
    images: Arc<dyn ImageStore>,
    queue: OfflineWriteQueue,
    monitor: ConnectivityMonitor,
    session: SessionState,
    products: Arc<RwLock<Vec<Product>>>,
}

impl ProductStore {
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        images: Arc<dyn ImageStore>,
        queue: OfflineWriteQueue,
        monitor: ConnectivityMonitor,
        session: SessionState,
    ) -> Self {
        ProductStore {
            remote,
            images,
            queue,
            monitor,
            session,
            products: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Last fetched products.
    pub async fn list(&self) -> Vec<Product> {
        self.products.read().await.clone()
    }

    /// Loads the user's products from the remote store.
    pub async fn fetch(&self) -> AppResult<Vec<Product>> {
        let user_id = self.session.user_id().await?;
        let query = Query::new().where_eq("userId", user_id.as_str());

        let products = self
            .remote
            .query(Collection::Inventory, &query)
            .await?
            .iter()
            .map(|doc| doc.decode::<Product>())
            .collect::<Result<Vec<_>, _>>()?;

        *self.products.write().await = products.clone();
        Ok(products)
    }

    /// Looks a product up in the cache, falling back to the remote store.
    pub async fn find(&self, id: &str) -> AppResult<Product> {
        if let Some(product) = self.products.read().await.iter().find(|p| p.id == id) {
            return Ok(product.clone());
        }

        match self.remote.get(Collection::Inventory, id).await? {
            Some(doc) => Ok(doc.decode()?),
            None => Err(AppError::not_found("Product", id)),
        }
    }

    /// Creates a product, or queues it when offline.
    pub async fn add(&self, input: NewProduct) -> AppResult<WriteOutcome> {
        input.validate()?;
        let user_id = self.session.user_id().await?;

        if !self.monitor.is_connected() {
            let name = input.name.clone();
            self.queue
                .enqueue(QueuedWrite::Product(Owned::new(input, user_id)))
                .await
                .inspect_err(|e| warn!(error = %e, name = %name, "Could not queue product"))?;
            info!(name = %name, "Offline, product queued");
            return Ok(WriteOutcome::Queued);
        }

        let image_url = host_image(self.images.as_ref(), input.image.as_ref()).await?;
        let owned = Owned::new(input.into_record(image_url), user_id);
        let id = self
            .remote
            .create(Collection::Inventory, to_fields(&owned)?)
            .await?;
        info!(id = %id, name = %owned.record.name, "Product created");

        if let Err(e) = self.fetch().await {
            warn!(error = %e, "Product saved but the list could not be refreshed");
        }
        Ok(WriteOutcome::Saved(id))
    }

    /// Applies a partial update, uploading `new_image` first when set.
    pub async fn update(&self, id: &str, mut update: ProductUpdate) -> AppResult<()> {
        update.validate()?;
        if !self.monitor.is_connected() {
            return Err(SyncError::Offline.into());
        }

        let new_image = update.new_image.take();
        let image_url = host_image(self.images.as_ref(), new_image.as_ref()).await?;

        self.remote
            .update(Collection::Inventory, id, update.into_fields(image_url))
            .await?;
        info!(id = %id, "Product updated");

        self.fetch().await?;
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> AppResult<()> {
        if !self.monitor.is_connected() {
            return Err(SyncError::Offline.into());
        }

        self.remote.delete(Collection::Inventory, id).await?;
        info!(id = %id, "Product deleted");

        self.products.write().await.retain(|p| p.id != id);
        Ok(())
    }
}
