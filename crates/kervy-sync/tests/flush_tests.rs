use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Notify;

use kervy_core::{Collection, EntityType, ImageSource, NewCategory, NewProduct, Owned, QueuedWrite};
use kervy_db::{Database, DbConfig, DbError, DbResult, LocalStorage, MemoryStorage};
use kervy_sync::{
    BatchWrite, ConnectivityMonitor, Document, MemoryImageStore, MemoryRemoteStore,
    OfflineWriteQueue, Query, RemoteStore, SyncAgentBuilder, SyncConfig, SyncFlusher, SyncResult,
};

// ── Helpers ─────────────────────────────────────────────────────

/// Remote store that logs creates in call order and can pause inside one.
#[derive(Default)]
struct LoggingRemote {
    inner: MemoryRemoteStore,
    log: Mutex<Vec<(Collection, String)>>,
    gate: Option<(Arc<Notify>, Arc<Notify>)>,
}

impl LoggingRemote {
    fn gated(entered: Arc<Notify>, release: Arc<Notify>) -> Self {
        LoggingRemote {
            gate: Some((entered, release)),
            ..Default::default()
        }
    }

    fn log(&self) -> Vec<(Collection, String)> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteStore for LoggingRemote {
    async fn create(&self, collection: Collection, fields: Map<String, Value>) -> SyncResult<String> {
        if let Some((entered, release)) = &self.gate {
            entered.notify_one();
            release.notified().await;
        }
        let name = fields
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let id = self.inner.create(collection, fields).await?;
        self.log.lock().unwrap().push((collection, name));
        Ok(id)
    }

    async fn get(&self, collection: Collection, id: &str) -> SyncResult<Option<Document>> {
        self.inner.get(collection, id).await
    }

    async fn query(&self, collection: Collection, query: &Query) -> SyncResult<Vec<Document>> {
        self.inner.query(collection, query).await
    }

    async fn update(&self, collection: Collection, id: &str, fields: Map<String, Value>) -> SyncResult<()> {
        self.inner.update(collection, id, fields).await
    }

    async fn delete(&self, collection: Collection, id: &str) -> SyncResult<()> {
        self.inner.delete(collection, id).await
    }

    async fn commit(&self, writes: Vec<BatchWrite>) -> SyncResult<()> {
        self.inner.commit(writes).await
    }
}

/// Storage whose writes can be switched to fail.
#[derive(Default)]
struct FlakyStorage {
    inner: MemoryStorage,
    failing: AtomicBool,
}

impl FlakyStorage {
    fn check(&self) -> DbResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(DbError::QueryFailed("disk I/O error".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl LocalStorage for FlakyStorage {
    async fn get(&self, key: &str) -> DbResult<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> DbResult<()> {
        self.check()?;
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> DbResult<()> {
        self.check()?;
        self.inner.remove(key).await
    }
}

fn category(name: &str) -> QueuedWrite {
    QueuedWrite::Category(Owned::new(NewCategory::new(name), "user-1"))
}

fn product(name: &str, image: Option<&str>) -> QueuedWrite {
    QueuedWrite::Product(Owned::new(
        NewProduct {
            name: name.to_string(),
            description: "Best seller".to_string(),
            price_cents: 4500,
            stock: 20,
            category_id: "cat-1".to_string(),
            image: image.map(ImageSource::new),
        },
        "user-1",
    ))
}

fn memory_queue() -> OfflineWriteQueue {
    OfflineWriteQueue::new(Arc::new(MemoryStorage::new()))
}

// ── Queue over SQLite ───────────────────────────────────────────

#[tokio::test]
async fn queue_returns_every_write_in_order_from_sqlite() {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let queue = OfflineWriteQueue::new(Arc::new(db.local_storage()));

    let names: Vec<String> = (1..=10).map(|n| format!("Category {n}")).collect();
    for name in &names {
        queue.enqueue(category(name)).await.unwrap();
    }

    let drained = queue.drain(EntityType::Category).await.unwrap();
    let drained_names: Vec<String> = drained.iter().map(|w| w.name().to_string()).collect();
    assert_eq!(drained_names, names);
}

// ── Flushing ────────────────────────────────────────────────────

#[tokio::test]
async fn flush_replays_in_order_and_empties_queue() {
    let queue = memory_queue();
    queue.enqueue(category("Drinks")).await.unwrap();
    queue.enqueue(category("Snacks")).await.unwrap();

    let remote = Arc::new(LoggingRemote::default());
    let flusher = SyncFlusher::new(queue.clone(), remote.clone(), Arc::new(MemoryImageStore::new()));

    let report = flusher.flush_all().await.unwrap();

    assert!(report.is_complete());
    assert_eq!(report.categories.replayed, 2);
    assert_eq!(
        remote.log(),
        vec![
            (Collection::Categories, "Drinks".to_string()),
            (Collection::Categories, "Snacks".to_string()),
        ]
    );
    assert!(queue.drain(EntityType::Category).await.unwrap().is_empty());

    let stored = remote.inner.documents(Collection::Categories);
    assert!(stored.iter().all(|d| d.fields["userId"] == "user-1"));
}

#[tokio::test]
async fn flush_replays_categories_before_products() {
    let queue = memory_queue();
    queue.enqueue(product("Iced Tea", None)).await.unwrap();
    queue.enqueue(category("Drinks")).await.unwrap();

    let remote = Arc::new(LoggingRemote::default());
    let flusher = SyncFlusher::new(queue.clone(), remote.clone(), Arc::new(MemoryImageStore::new()));
    flusher.flush_all().await.unwrap();

    assert_eq!(
        remote.log(),
        vec![
            (Collection::Categories, "Drinks".to_string()),
            (Collection::Inventory, "Iced Tea".to_string()),
        ]
    );
    assert_eq!(queue.pending().await.unwrap(), 0);
}

#[tokio::test]
async fn flush_uploads_local_image_before_writing_product() {
    let queue = memory_queue();
    queue
        .enqueue(product("Ube Halaya", Some("file:///sdcard/DCIM/ube.jpg")))
        .await
        .unwrap();
    queue
        .enqueue(product("Leche Flan", Some("https://cdn.test/flan.jpg")))
        .await
        .unwrap();

    let remote = Arc::new(MemoryRemoteStore::new());
    let images = Arc::new(MemoryImageStore::new());
    let flusher = SyncFlusher::new(queue, remote.clone(), images.clone());
    flusher.flush_all().await.unwrap();

    let uploads = images.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].0, "file:///sdcard/DCIM/ube.jpg");
    assert!(uploads[0].1.starts_with("pos-kervy/"));
    assert!(uploads[0].1.ends_with("ube.jpg"));

    let products = remote.documents(Collection::Inventory);
    let ube = products.iter().find(|d| d.fields["name"] == "Ube Halaya").unwrap();
    assert_eq!(ube.fields["image"], MemoryImageStore::url_for(&uploads[0].1));

    let flan = products.iter().find(|d| d.fields["name"] == "Leche Flan").unwrap();
    assert_eq!(flan.fields["image"], "https://cdn.test/flan.jpg");
}

#[tokio::test]
async fn failed_item_and_rest_stay_queued() {
    let queue = memory_queue();
    for name in ["One", "Two", "Three"] {
        queue.enqueue(category(name)).await.unwrap();
    }
    queue.enqueue(product("Turon", None)).await.unwrap();

    let remote = Arc::new(MemoryRemoteStore::new());
    remote.fail_on_create(2);
    let flusher = SyncFlusher::new(queue.clone(), remote.clone(), Arc::new(MemoryImageStore::new()));

    let report = flusher.flush_all().await.unwrap();
    assert_eq!(report.categories.replayed, 1);
    assert_eq!(report.categories.retained, 2);
    assert_eq!(report.products.retained, 1);
    assert!(report.error.is_some());

    let left: Vec<String> = queue
        .drain(EntityType::Category)
        .await
        .unwrap()
        .iter()
        .map(|w| w.name().to_string())
        .collect();
    assert_eq!(left, vec!["Two", "Three"]);
    assert_eq!(remote.documents(Collection::Categories).len(), 1);

    // The next flush picks up where the last one stopped.
    let report = flusher.flush_all().await.unwrap();
    assert!(report.is_complete());
    assert_eq!(remote.documents(Collection::Categories).len(), 3);
    assert_eq!(remote.documents(Collection::Inventory).len(), 1);
}

#[tokio::test]
async fn failed_image_upload_keeps_product_queued() {
    let queue = memory_queue();
    queue
        .enqueue(product("Bibingka", Some("/storage/bibingka.jpg")))
        .await
        .unwrap();

    let remote = Arc::new(MemoryRemoteStore::new());
    let images = Arc::new(MemoryImageStore::new());
    images.set_failing(true);

    let flusher = SyncFlusher::new(queue.clone(), remote.clone(), images);
    let report = flusher.flush_all().await.unwrap();

    assert_eq!(report.products.retained, 1);
    assert!(remote.documents(Collection::Inventory).is_empty());
    assert_eq!(queue.len(EntityType::Product).await.unwrap(), 1);
}

#[tokio::test]
async fn replay_after_failed_removal_duplicates_remote_record() {
    let storage = Arc::new(FlakyStorage::default());
    let queue = OfflineWriteQueue::new(storage.clone());
    queue.enqueue(category("Drinks")).await.unwrap();

    let remote = Arc::new(MemoryRemoteStore::new());
    let flusher = SyncFlusher::new(queue.clone(), remote.clone(), Arc::new(MemoryImageStore::new()));

    storage.failing.store(true, Ordering::SeqCst);
    let report = flusher.flush_all().await.unwrap();
    assert!(report.error.is_some());
    assert_eq!(queue.len(EntityType::Category).await.unwrap(), 1);

    storage.failing.store(false, Ordering::SeqCst);
    flusher.flush_all().await.unwrap();

    // At-least-once: the same write now exists twice remotely.
    let docs = remote.documents(Collection::Categories);
    assert_eq!(docs.len(), 2);
    assert!(docs.iter().all(|d| d.fields["name"] == "Drinks"));
    assert_eq!(queue.pending().await.unwrap(), 0);
}

#[tokio::test]
async fn concurrent_flushes_replay_each_write_once() {
    let queue = memory_queue();
    for name in ["A", "B", "C"] {
        queue.enqueue(category(name)).await.unwrap();
    }

    let remote = Arc::new(MemoryRemoteStore::new());
    let flusher = Arc::new(SyncFlusher::new(
        queue.clone(),
        remote.clone(),
        Arc::new(MemoryImageStore::new()),
    ));

    let (first, second) = tokio::join!(flusher.flush_all(), flusher.flush_all());
    assert_eq!(first.unwrap().replayed() + second.unwrap().replayed(), 3);
    assert_eq!(remote.documents(Collection::Categories).len(), 3);
}

#[tokio::test]
async fn write_enqueued_during_flush_survives() {
    let queue = memory_queue();
    queue.enqueue(category("Drinks")).await.unwrap();

    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let remote = Arc::new(LoggingRemote::gated(entered.clone(), release.clone()));
    let flusher = Arc::new(SyncFlusher::new(
        queue.clone(),
        remote.clone(),
        Arc::new(MemoryImageStore::new()),
    ));

    let running = tokio::spawn({
        let flusher = flusher.clone();
        async move { flusher.flush_all().await }
    });

    entered.notified().await;
    queue.enqueue(category("Desserts")).await.unwrap();
    release.notify_one();

    let report = running.await.unwrap().unwrap();
    assert_eq!(report.categories.replayed, 1);

    let left = queue.drain(EntityType::Category).await.unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].name(), "Desserts");
}

// ── Agent ───────────────────────────────────────────────────────

async fn wait_for<F>(mut done: F)
where
    F: FnMut() -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        while !done() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn agent_flushes_when_connection_returns() {
    let queue = memory_queue();
    queue.enqueue(category("Drinks")).await.unwrap();
    queue.enqueue(category("Snacks")).await.unwrap();

    let remote = Arc::new(MemoryRemoteStore::new());
    let flusher = Arc::new(SyncFlusher::new(
        queue.clone(),
        remote.clone(),
        Arc::new(MemoryImageStore::new()),
    ));
    let monitor = ConnectivityMonitor::new(false);

    let mut agent = SyncAgentBuilder::new(SyncConfig::default())
        .with_flusher(flusher)
        .with_monitor(monitor.clone())
        .build()
        .unwrap();
    let handle = agent.start().await.unwrap();

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(remote.create_count(), 0);

    monitor.set_connected(true);
    wait_for(|| remote.create_count() == 2).await;

    let status = {
        let mut status = handle.status().await;
        for _ in 0..100 {
            if status.last_flush_at.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            status = handle.status().await;
        }
        status
    };
    assert!(status.connected);
    assert_eq!(status.pending, 0);
    assert!(status.last_error.is_none());

    agent.shutdown().await.unwrap();
}

#[tokio::test]
async fn agent_flushes_at_startup_when_online() {
    let queue = memory_queue();
    queue.enqueue(product("Turon", None)).await.unwrap();

    let remote = Arc::new(MemoryRemoteStore::new());
    let flusher = Arc::new(SyncFlusher::new(
        queue.clone(),
        remote.clone(),
        Arc::new(MemoryImageStore::new()),
    ));

    let mut agent = SyncAgentBuilder::new(SyncConfig::default())
        .with_flusher(flusher)
        .with_monitor(ConnectivityMonitor::new(true))
        .build()
        .unwrap();
    agent.start().await.unwrap();

    wait_for(|| remote.create_count() == 1).await;
    agent.shutdown().await.unwrap();
}

#[tokio::test]
async fn agent_swallows_flush_failures() {
    let queue = memory_queue();
    queue.enqueue(category("Drinks")).await.unwrap();

    let remote = Arc::new(MemoryRemoteStore::new());
    remote.set_unreachable(true);
    let flusher = Arc::new(SyncFlusher::new(
        queue.clone(),
        remote.clone(),
        Arc::new(MemoryImageStore::new()),
    ));
    let monitor = ConnectivityMonitor::new(false);

    let mut agent = SyncAgentBuilder::new(SyncConfig::default())
        .with_flusher(flusher)
        .with_monitor(monitor.clone())
        .build()
        .unwrap();
    let handle = agent.start().await.unwrap();

    monitor.set_connected(true);
    for _ in 0..200 {
        if handle.status().await.last_error.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(handle.status().await.last_error.is_some());
    assert_eq!(queue.pending().await.unwrap(), 1);

    // Next reconnect retries.
    remote.set_unreachable(false);
    monitor.set_connected(false);
    monitor.set_connected(true);
    wait_for(|| remote.create_count() == 1).await;

    handle.shutdown().await;
}
