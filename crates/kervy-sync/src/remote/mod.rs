//! # Remote Services
//!
//! Contracts for the cloud document store and image store, plus their
//! Firebase and in-memory implementations.
//!
//! ```text
//! ┌──────────────────────────────┐     ┌──────────────────────────────────┐
//! │  dyn RemoteStore             │     │  dyn ImageStore                  │
//! │  create / get / query        │     │  upload(image, path) → URL       │
//! │  update / delete / commit    │     │                                  │
//! ├──────────────────────────────┤     ├──────────────────────────────────┤
//! │  FirestoreClient  (REST)     │     │  FirebaseImageStore (REST)       │
//! │  MemoryRemoteStore (tests)   │     │  MemoryImageStore   (tests)      │
//! └──────────────────────────────┘     └──────────────────────────────────┘
//! ```

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use kervy_core::{Collection, ImageSource};

use crate::error::{SyncError, SyncResult};

pub mod firestore;
pub mod memory;
pub mod storage;

pub use firestore::FirestoreClient;
pub use memory::{MemoryImageStore, MemoryRemoteStore};
pub use storage::FirebaseImageStore;

pub use crate::token::TokenCell;

/// Creates an empty token slot that never refreshes.
pub fn token_cell() -> TokenCell {
    TokenCell::new()
}

// =============================================================================
// Queries
// =============================================================================

/// Sort direction for [`OrderBy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Equality filter on a top-level field.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Collection query: AND of equality filters, optional ordering and limit.
///
/// ## Example
/// ```rust
/// use kervy_sync::remote::{Direction, Query};
///
/// let latest = Query::new()
///     .where_eq("userId", "user-1")
///     .order_by("date", Direction::Descending)
///     .limit(1);
/// assert_eq!(latest.filters.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

// =============================================================================
// Documents & Batches
// =============================================================================

/// A stored document: its id and fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl Document {
    /// Decodes the document into a record, with `id` set to the document id.
    pub fn decode<T: DeserializeOwned>(&self) -> SyncResult<T> {
        let mut fields = self.fields.clone();
        fields.insert("id".to_string(), Value::String(self.id.clone()));
        serde_json::from_value(Value::Object(fields)).map_err(|e| {
            SyncError::DeserializationFailed(format!("document {}: {}", self.id, e))
        })
    }
}

/// One write inside an atomic [`RemoteStore::commit`].
#[derive(Debug, Clone, PartialEq)]
pub enum BatchWrite {
    /// Merge `fields` into an existing document.
    Update {
        collection: Collection,
        id: String,
        fields: Map<String, Value>,
    },
    Delete {
        collection: Collection,
        id: String,
    },
}

/// Serializes a record into a field map.
pub fn to_fields<T: serde::Serialize>(record: &T) -> SyncResult<Map<String, Value>> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        other => Err(SyncError::SerializationFailed(format!(
            "expected an object, got {}",
            other
        ))),
    }
}

// =============================================================================
// Store Traits
// =============================================================================

/// Cloud document store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Creates a document with a generated id and returns the id.
    async fn create(&self, collection: Collection, fields: Map<String, Value>) -> SyncResult<String>;

    async fn get(&self, collection: Collection, id: &str) -> SyncResult<Option<Document>>;

    async fn query(&self, collection: Collection, query: &Query) -> SyncResult<Vec<Document>>;

    /// Merges `fields` into an existing document. Missing documents are
    /// [`SyncError::NotFound`].
    async fn update(
        &self,
        collection: Collection,
        id: &str,
        fields: Map<String, Value>,
    ) -> SyncResult<()>;

    async fn delete(&self, collection: Collection, id: &str) -> SyncResult<()>;

    /// Applies every write or none of them.
    async fn commit(&self, writes: Vec<BatchWrite>) -> SyncResult<()>;
}

/// Binary object store for product images.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Uploads the image to `path` and returns its download URL.
    async fn upload(&self, image: &ImageSource, path: &str) -> SyncResult<String>;
}

/// Returns the hosted URL for a product image, uploading it first when it
/// is still a local file.
///
/// Remote URLs are passed through unchanged. Local images land at
/// `pos-kervy/<uuid><filename>`.
pub async fn host_image(
    images: &dyn ImageStore,
    image: Option<&ImageSource>,
) -> SyncResult<Option<String>> {
    match image {
        None => Ok(None),
        Some(image) if image.is_remote() => Ok(Some(image.uri.clone())),
        Some(image) => {
            let path = image.storage_path(&Uuid::new_v4());
            debug!(uri = %image.uri, path = %path, "Uploading local image");
            images.upload(image, &path).await.map(Some)
        }
    }
}
