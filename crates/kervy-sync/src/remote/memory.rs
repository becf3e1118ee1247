//! In-memory remote and image stores.
//!
//! Used by tests and by the terminal when no cloud project is configured.
//! Both support failure injection so flush and checkout error paths can be
//! exercised without a network.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};
use uuid::Uuid;

use kervy_core::{Collection, ImageSource};

use super::{BatchWrite, Direction, Document, ImageStore, Query, RemoteStore};
use crate::error::{SyncError, SyncResult};

type Documents = HashMap<Collection, BTreeMap<String, Map<String, Value>>>;

#[derive(Default)]
struct Inner {
    documents: Documents,
    creates: usize,
    fail_on_create: Option<usize>,
    failing_queries: bool,
    unreachable: bool,
}

/// Document store held in process memory.
#[derive(Default)]
pub struct MemoryRemoteStore {
    inner: Mutex<Inner>,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the `nth` create call (1-based, counted from now) fail.
    pub fn fail_on_create(&self, nth: usize) {
        let mut inner = self.lock();
        inner.fail_on_create = Some(inner.creates + nth);
    }

    /// Makes `query` fail with a 503 while other calls keep working.
    pub fn set_failing_queries(&self, failing: bool) {
        self.lock().failing_queries = failing;
    }

    /// Makes every call fail as if the network were down.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.lock().unreachable = unreachable;
    }

    /// Number of create calls that succeeded.
    pub fn create_count(&self) -> usize {
        self.lock().creates
    }

    /// Every document in `collection`, ordered by id.
    pub fn documents(&self, collection: Collection) -> Vec<Document> {
        self.lock()
            .documents
            .get(&collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| Document {
                        id: id.clone(),
                        fields: fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Seeds a document with a known id.
    pub fn insert(&self, collection: Collection, id: impl Into<String>, fields: Map<String, Value>) {
        self.lock()
            .documents
            .entry(collection)
            .or_default()
            .insert(id.into(), fields);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_reachable(inner: &Inner) -> SyncResult<()> {
        if inner.unreachable {
            Err(SyncError::ConnectionFailed("remote store unreachable".into()))
        } else {
            Ok(())
        }
    }
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Number(a)), Some(Value::Number(b))) => {
            let (a, b) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn create(&self, collection: Collection, fields: Map<String, Value>) -> SyncResult<String> {
        let mut inner = self.lock();
        Self::check_reachable(&inner)?;

        if inner.fail_on_create == Some(inner.creates + 1) {
            inner.fail_on_create = None;
            return Err(SyncError::Remote {
                status: 503,
                message: format!("injected failure creating in {}", collection),
            });
        }

        let id = Uuid::new_v4().to_string();
        inner
            .documents
            .entry(collection)
            .or_default()
            .insert(id.clone(), fields);
        inner.creates += 1;
        Ok(id)
    }

    async fn get(&self, collection: Collection, id: &str) -> SyncResult<Option<Document>> {
        let inner = self.lock();
        Self::check_reachable(&inner)?;

        Ok(inner
            .documents
            .get(&collection)
            .and_then(|docs| docs.get(id))
            .map(|fields| Document {
                id: id.to_string(),
                fields: fields.clone(),
            }))
    }

    async fn query(&self, collection: Collection, query: &Query) -> SyncResult<Vec<Document>> {
        let inner = self.lock();
        Self::check_reachable(&inner)?;
        if inner.failing_queries {
            return Err(SyncError::Remote {
                status: 503,
                message: format!("injected failure querying {}", collection),
            });
        }

        let mut docs: Vec<Document> = inner
            .documents
            .get(&collection)
            .into_iter()
            .flat_map(|docs| docs.iter())
            .filter(|(_, fields)| {
                query
                    .filters
                    .iter()
                    .all(|f| fields.get(&f.field) == Some(&f.value))
            })
            .map(|(id, fields)| Document {
                id: id.clone(),
                fields: fields.clone(),
            })
            .collect();

        if let Some(order) = &query.order_by {
            docs.sort_by(|a, b| {
                let ord = compare(a.fields.get(&order.field), b.fields.get(&order.field));
                match order.direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            });
        }

        if let Some(limit) = query.limit {
            docs.truncate(limit);
        }

        Ok(docs)
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        fields: Map<String, Value>,
    ) -> SyncResult<()> {
        let mut inner = self.lock();
        Self::check_reachable(&inner)?;

        let doc = inner
            .documents
            .get_mut(&collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| SyncError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        doc.extend(fields);
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> SyncResult<()> {
        let mut inner = self.lock();
        Self::check_reachable(&inner)?;

        if let Some(docs) = inner.documents.get_mut(&collection) {
            docs.remove(id);
        }
        Ok(())
    }

    async fn commit(&self, writes: Vec<BatchWrite>) -> SyncResult<()> {
        let mut inner = self.lock();
        Self::check_reachable(&inner)?;

        for write in &writes {
            if let BatchWrite::Update { collection, id, .. } = write {
                let exists = inner
                    .documents
                    .get(collection)
                    .is_some_and(|docs| docs.contains_key(id));
                if !exists {
                    return Err(SyncError::NotFound {
                        collection: collection.to_string(),
                        id: id.clone(),
                    });
                }
            }
        }

        for write in writes {
            match write {
                BatchWrite::Update {
                    collection,
                    id,
                    fields,
                } => {
                    if let Some(doc) = inner
                        .documents
                        .get_mut(&collection)
                        .and_then(|docs| docs.get_mut(&id))
                    {
                        doc.extend(fields);
                    }
                }
                BatchWrite::Delete { collection, id } => {
                    if let Some(docs) = inner.documents.get_mut(&collection) {
                        docs.remove(&id);
                    }
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// Image Store
// =============================================================================

/// Image store that records uploads and hands back fake URLs.
#[derive(Default)]
pub struct MemoryImageStore {
    uploads: Mutex<Vec<(String, String)>>,
    failing: Mutex<bool>,
}

impl MemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(source uri, object path)` of every successful upload, in order.
    pub fn uploads(&self) -> Vec<(String, String)> {
        self.uploads
            .lock()
            .map(|u| u.clone())
            .unwrap_or_default()
    }

    pub fn set_failing(&self, failing: bool) {
        if let Ok(mut flag) = self.failing.lock() {
            *flag = failing;
        }
    }

    /// URL returned for an object uploaded to `path`.
    pub fn url_for(path: &str) -> String {
        format!("https://images.invalid/{}", path)
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn upload(&self, image: &ImageSource, path: &str) -> SyncResult<String> {
        if self.failing.lock().map(|f| *f).unwrap_or(false) {
            return Err(SyncError::ImageUploadFailed(format!(
                "injected failure uploading {}",
                image.uri
            )));
        }

        if let Ok(mut uploads) = self.uploads.lock() {
            uploads.push((image.uri.clone(), path.to_string()));
        }
        Ok(Self::url_for(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_query_filters_orders_and_limits() {
        let store = MemoryRemoteStore::new();
        for (n, user, date) in [
            (1, "u1", "2024-01-01T00:00:00.000Z"),
            (2, "u2", "2024-01-02T00:00:00.000Z"),
            (3, "u1", "2024-01-03T00:00:00.000Z"),
        ] {
            store
                .create(
                    Collection::Transactions,
                    fields(json!({ "number": n, "userId": user, "date": date })),
                )
                .await
                .unwrap();
        }

        let query = Query::new()
            .where_eq("userId", "u1")
            .order_by("date", Direction::Descending)
            .limit(1);
        let docs = store.query(Collection::Transactions, &query).await.unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].fields["number"], 3);
    }

    #[tokio::test]
    async fn test_update_merges_and_requires_existing() {
        let store = MemoryRemoteStore::new();
        store.insert(Collection::Inventory, "p1", fields(json!({ "name": "Turon", "stock": 5 })));

        store
            .update(Collection::Inventory, "p1", fields(json!({ "stock": 3 })))
            .await
            .unwrap();
        let doc = store.get(Collection::Inventory, "p1").await.unwrap().unwrap();
        assert_eq!(doc.fields["name"], "Turon");
        assert_eq!(doc.fields["stock"], 3);

        let err = store
            .update(Collection::Inventory, "missing", Map::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_commit_is_all_or_nothing() {
        let store = MemoryRemoteStore::new();
        store.insert(Collection::Categories, "c1", fields(json!({ "name": "Drinks" })));

        let err = store
            .commit(vec![
                BatchWrite::Delete {
                    collection: Collection::Categories,
                    id: "c1".to_string(),
                },
                BatchWrite::Update {
                    collection: Collection::Inventory,
                    id: "ghost".to_string(),
                    fields: Map::new(),
                },
            ])
            .await;

        assert!(err.is_err());
        assert_eq!(store.documents(Collection::Categories).len(), 1);
    }

    #[tokio::test]
    async fn test_injected_create_failure() {
        let store = MemoryRemoteStore::new();
        store.fail_on_create(2);

        assert!(store.create(Collection::Categories, Map::new()).await.is_ok());
        assert!(store.create(Collection::Categories, Map::new()).await.is_err());
        assert!(store.create(Collection::Categories, Map::new()).await.is_ok());
        assert_eq!(store.create_count(), 2);
    }

    #[tokio::test]
    async fn test_image_store_records_uploads() {
        let images = MemoryImageStore::new();
        let url = images
            .upload(&ImageSource::new("/tmp/a.jpg"), "pos-kervy/xa.jpg")
            .await
            .unwrap();

        assert_eq!(url, "https://images.invalid/pos-kervy/xa.jpg");
        assert_eq!(images.uploads().len(), 1);

        images.set_failing(true);
        assert!(images
            .upload(&ImageSource::new("/tmp/b.jpg"), "pos-kervy/yb.jpg")
            .await
            .is_err());
    }
}
