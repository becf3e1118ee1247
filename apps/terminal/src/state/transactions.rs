//! # Transaction Store
//!
//! Completed sales and the stock they consume.
//!
//! ## Saving a Sale
//! ```text
//! add(tx)
//!   │
//!   ├─ 1. read stock of every line ── any stock − qty < 0 ? ──► InsufficientStock
//!   │                                                          (nothing written)
//!   │     line whose product is gone ──► warn, no stock write for it
//!   ├─ 2. Transactions.create(tx + userId)
//!   └─ 3. commit [ Inventory/{id}.stock = stock − qty, ... ]   (one atomic batch)
//! ```
//!
//! Dates are stored as fixed-width UTC timestamps, so ordering by `date`
//! in the remote store is chronological.

use std::sync::Arc;

use serde_json::{json, Map};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use kervy_core::{Collection, CoreError, NewTransaction, Owned, Product, Transaction};
use kervy_sync::remote::to_fields;
use kervy_sync::{
    BatchWrite, ConnectivityMonitor, Direction, Query, RemoteStore, SyncError,
};

use super::session::SessionState;
use crate::error::AppResult;

/// Transaction history plus the sale write path.
#[derive(Clone)]
pub struct TransactionStore {
    remote: Arc<dyn RemoteStore>,
    monitor: ConnectivityMonitor,
    session: SessionState,
    transactions: Arc<RwLock<Vec<Transaction>>>,
}

impl TransactionStore {
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        monitor: ConnectivityMonitor,
        session: SessionState,
    ) -> Self {
        TransactionStore {
            remote,
            monitor,
            session,
            transactions: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Last fetched history, newest first.
    pub async fn list(&self) -> Vec<Transaction> {
        self.transactions.read().await.clone()
    }

    /// Saves the sale and takes its quantities out of stock.
    pub async fn add(&self, tx: NewTransaction) -> AppResult<Transaction> {
        if !self.monitor.is_connected() {
            return Err(SyncError::Offline.into());
        }
        let user_id = self.session.user_id().await?;

        let mut stock_writes = Vec::with_capacity(tx.products.len());
        for line in &tx.products {
            let Some(doc) = self.remote.get(Collection::Inventory, &line.id).await? else {
                warn!(product_id = %line.id, name = %line.name, "Product no longer exists, selling without a stock update");
                continue;
            };
            let product: Product = doc.decode()?;

            let remaining = product.stock - line.quantity;
            if remaining < 0 {
                return Err(CoreError::InsufficientStock {
                    product: product.name,
                    available: product.stock,
                    requested: line.quantity,
                }
                .into());
            }

            let mut fields = Map::new();
            fields.insert("stock".to_string(), json!(remaining));
            stock_writes.push(BatchWrite::Update {
                collection: Collection::Inventory,
                id: line.id.clone(),
                fields,
            });
        }

        let owned = Owned::new(tx, user_id);
        let id = self
            .remote
            .create(Collection::Transactions, to_fields(&owned)?)
            .await?;
        if !stock_writes.is_empty() {
            debug!(id = %id, lines = stock_writes.len(), "Decrementing stock");
            self.remote.commit(stock_writes).await?;
        }

        let saved = Transaction::from_new(id, owned);
        info!(id = %saved.id, number = saved.number, total_cents = saved.total_cents, "Sale saved");

        self.transactions.write().await.insert(0, saved.clone());
        Ok(saved)
    }

    /// Loads the user's history, newest first.
    pub async fn fetch(&self) -> AppResult<Vec<Transaction>> {
        let transactions = self.query(None).await?;
        *self.transactions.write().await = transactions.clone();
        Ok(transactions)
    }

    /// The most recent sale, used to number the next one.
    pub async fn fetch_latest(&self) -> AppResult<Option<Transaction>> {
        Ok(self.query(Some(1)).await?.into_iter().next())
    }

    pub async fn delete(&self, id: &str) -> AppResult<()> {
        if !self.monitor.is_connected() {
            return Err(SyncError::Offline.into());
        }

        self.remote.delete(Collection::Transactions, id).await?;
        info!(id = %id, "Transaction deleted");

        self.transactions.write().await.retain(|t| t.id != id);
        Ok(())
    }

    async fn query(&self, limit: Option<usize>) -> AppResult<Vec<Transaction>> {
        let user_id = self.session.user_id().await?;
        let mut query = Query::new()
            .where_eq("userId", user_id.as_str())
            .order_by("date", Direction::Descending);
        if let Some(limit) = limit {
            query = query.limit(limit);
        }

        let transactions = self
            .remote
            .query(Collection::Transactions, &query)
            .await?
            .iter()
            .map(|doc| doc.decode::<Transaction>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(transactions)
    }
}
