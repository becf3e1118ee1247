//! # App Context
//!
//! Builds every collaborator once and hands out the state objects.
//!
//! ## Wiring
//! ```text
//! SyncConfig ──┬── cloud configured? ── yes ──► FirestoreClient / FirebaseImageStore / FirebaseAuth
//!              │                        no  ──► MemoryRemoteStore / MemoryImageStore / MemoryAuth
//!              │
//!              ├── database_path ──► Database (SQLite) ──► LocalStorage ──► OfflineWriteQueue
//!              └── connectivity  ──► TcpProbe ──► ConnectivityMonitor
//!
//!  TokenCell is shared by SessionState (writer) and the REST clients (readers),
//!  and refreshes the ID token through the same AuthProvider.
//! ```

use std::sync::Arc;

use tracing::{info, warn};

use kervy_db::{Database, DbConfig, LocalStorage};
use kervy_sync::remote::{FirebaseImageStore, FirestoreClient};
use kervy_sync::{
    AuthProvider, ConnectivityMonitor, FirebaseAuth, ImageStore, MemoryAuth, MemoryImageStore,
    MemoryRemoteStore, OfflineWriteQueue, ReachabilityProbe, RemoteStore, SyncAgent,
    SyncAgentBuilder, SyncConfig, SyncEventEmitter, SyncFlusher, SyncStatus, TcpProbe, TokenCell,
};

use crate::commands::checkout::Till;
use crate::error::AppResult;
use crate::state::{CartState, CategoryStore, ConfigState, ProductStore, SessionState, TransactionStore};

/// External services the terminal talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub remote: Arc<dyn RemoteStore>,
    pub images: Arc<dyn ImageStore>,
    pub auth: Arc<dyn AuthProvider>,
    pub storage: Arc<dyn LocalStorage>,
    pub token: TokenCell,
}

impl Collaborators {
    /// In-process stand-ins for every service.
    ///
    /// Any email signs in, with a user id derived from it, so records queued
    /// in one run belong to the same cashier in the next.
    pub fn in_memory(storage: Arc<dyn LocalStorage>) -> Self {
        let auth: Arc<dyn AuthProvider> = Arc::new(MemoryAuth::registering());
        Collaborators {
            remote: Arc::new(MemoryRemoteStore::new()),
            images: Arc::new(MemoryImageStore::new()),
            token: TokenCell::refreshing(auth.clone()),
            auth,
            storage,
        }
    }

    /// REST clients for the configured Firebase project.
    pub fn firebase(config: &SyncConfig, storage: Arc<dyn LocalStorage>) -> AppResult<Self> {
        let auth: Arc<dyn AuthProvider> = Arc::new(FirebaseAuth::new(&config.firebase)?);
        let token = TokenCell::refreshing(auth.clone());
        Ok(Collaborators {
            remote: Arc::new(FirestoreClient::new(&config.firebase, token.clone())?),
            images: Arc::new(FirebaseImageStore::new(&config.firebase, token.clone())?),
            auth,
            storage,
            token,
        })
    }
}

/// Everything a terminal session needs.
pub struct AppContext {
    pub sync_config: SyncConfig,
    pub config: ConfigState,
    pub monitor: ConnectivityMonitor,
    pub queue: OfflineWriteQueue,
    pub flusher: Arc<SyncFlusher>,
    pub session: SessionState,
    pub categories: CategoryStore,
    pub products: ProductStore,
    pub cart: CartState,
    pub transactions: TransactionStore,
    probe: Option<Arc<dyn ReachabilityProbe>>,
    database: Option<Database>,
}

impl AppContext {
    /// Wires the state objects around `collaborators`.
    pub fn new(
        sync_config: SyncConfig,
        config: ConfigState,
        collaborators: Collaborators,
        monitor: ConnectivityMonitor,
    ) -> Self {
        let Collaborators {
            remote,
            images,
            auth,
            storage,
            token,
        } = collaborators;

        let queue = OfflineWriteQueue::new(storage);
        let flusher = Arc::new(SyncFlusher::new(queue.clone(), remote.clone(), images.clone()));
        let session = SessionState::new(auth, remote.clone(), token);

        AppContext {
            categories: CategoryStore::new(
                remote.clone(),
                queue.clone(),
                monitor.clone(),
                session.clone(),
            ),
            products: ProductStore::new(
                remote.clone(),
                images,
                queue.clone(),
                monitor.clone(),
                session.clone(),
            ),
            transactions: TransactionStore::new(remote, monitor.clone(), session.clone()),
            cart: CartState::new(),
            sync_config,
            config,
            monitor,
            queue,
            flusher,
            session,
            probe: None,
            database: None,
        }
    }

    /// Opens the local database and connects the configured services.
    ///
    /// Without a Firebase project the in-memory services are used: the
    /// queue still lives in SQLite, but remote records last one run.
    pub async fn open(sync_config: SyncConfig, config: ConfigState) -> AppResult<Self> {
        let db_path = sync_config.database_path();
        info!(?db_path, "Opening local database");
        let database = Database::new(DbConfig::new(db_path)).await?;
        let storage: Arc<dyn LocalStorage> = Arc::new(database.local_storage());

        let (collaborators, probe): (_, Option<Arc<dyn ReachabilityProbe>>) =
            if sync_config.is_cloud_configured() {
                let probe: Arc<dyn ReachabilityProbe> = Arc::new(TcpProbe::new(
                    sync_config.connectivity.probe_address(),
                    sync_config.connectivity.probe_timeout(),
                ));
                (
                    Collaborators::firebase(&sync_config, storage)?,
                    Some(probe),
                )
            } else {
                warn!("No Firebase project configured, using in-memory services");
                (Collaborators::in_memory(storage), None)
            };

        let connected = match &probe {
            Some(probe) => probe.probe().await,
            None => true,
        };
        info!(connected, "Initial connectivity");

        let mut context = Self::new(
            sync_config,
            config,
            collaborators,
            ConnectivityMonitor::new(connected),
        );
        context.probe = probe;
        context.database = Some(database);
        Ok(context)
    }

    /// The state objects a checkout uses.
    pub fn till(&self) -> Till<'_> {
        Till {
            cart: &self.cart,
            transactions: &self.transactions,
            session: &self.session,
            config: &self.config,
        }
    }

    /// Builds the flush-on-reconnect agent, polling reachability when a
    /// probe is available.
    pub fn sync_agent(&self) -> AppResult<SyncAgent> {
        let mut builder = SyncAgentBuilder::new(self.sync_config.clone())
            .with_flusher(self.flusher.clone())
            .with_monitor(self.monitor.clone())
            .with_emitter(Arc::new(LogEmitter));
        if let Some(probe) = &self.probe {
            builder = builder.with_probe(probe.clone());
        }
        Ok(builder.build()?)
    }

    /// Closes the local database.
    pub async fn close(&self) {
        if let Some(database) = &self.database {
            database.close().await;
        }
    }
}

/// Reports sync progress through the log.
pub struct LogEmitter;

impl SyncEventEmitter for LogEmitter {
    fn emit_status(&self, status: &SyncStatus) {
        info!(
            connected = status.connected,
            pending = status.pending,
            flushing = status.flushing,
            "Sync status"
        );
    }

    fn emit_progress(&self, pending: usize, replayed: usize) {
        info!(pending, replayed, "Sync progress");
    }

    fn emit_error(&self, message: &str, retryable: bool) {
        warn!(retryable, "Sync error: {}", message);
    }
}
