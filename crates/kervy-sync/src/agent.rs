//! # Sync Agent
//!
//! Wires the connectivity monitor to the flusher: every time the device comes
//! back online, the offline queue is replayed.
//!
//! ## Reconnect Loop
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    monitor ──► loop ──► flusher                         │
//! │                                                                         │
//! │  ┌────────────────────┐   events (bool)   ┌──────────────────────────┐ │
//! │  │ ConnectivityMonitor│ ─────────────────►│  agent loop              │ │
//! │  │  ▲                 │                   │                          │ │
//! │  │  │ TcpProbe (poll) │                   │  false → true ?          │ │
//! │  └──┴─────────────────┘                   │     └─► flusher.flush_all│ │
//! │                                           │  shutdown_rx ─► break    │ │
//! │                                           └────────────┬─────────────┘ │
//! │                                                        │               │
//! │                                                        ▼               │
//! │                                      SyncStatus  +  SyncEventEmitter   │
//! │                                                                         │
//! │  STATUS EVENTS:                                                        │
//! │  ──────────────                                                        │
//! │  emit_status   - { connected, pending, last_flush_at, last_error }     │
//! │  emit_progress - (pending, replayed) after each flush                  │
//! │  emit_error    - (message, retryable) when a flush stops early         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Flush failures never leave the agent: they are logged, recorded in the
//! status and emitted. The queue keeps whatever was not replayed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::SyncConfig;
use crate::connectivity::{ConnectivityMonitor, ReachabilityProbe};
use crate::error::{SyncError, SyncResult};
use crate::flusher::{FlushReport, SyncFlusher};

// =============================================================================
// Sync Status
// =============================================================================

/// What the terminal's status line shows.
#[derive(Debug, Clone, Default)]
pub struct SyncStatus {
    /// Last reported reachability.
    pub connected: bool,

    /// Writes still queued locally.
    pub pending: usize,

    /// A flush is running right now.
    pub flushing: bool,

    /// When the last flush finished.
    pub last_flush_at: Option<DateTime<Utc>>,

    /// Outcome of the last flush.
    pub last_report: Option<FlushReport>,

    /// Why the last flush stopped early.
    pub last_error: Option<String>,
}

// =============================================================================
// Notifications
// =============================================================================

/// Receives sync notifications (status line, toasts, logs).
pub trait SyncEventEmitter: Send + Sync {
    fn emit_status(&self, status: &SyncStatus);

    fn emit_progress(&self, pending: usize, replayed: usize);

    fn emit_error(&self, message: &str, retryable: bool);
}

/// Drops every notification.
pub struct NoOpEmitter;

impl SyncEventEmitter for NoOpEmitter {
    fn emit_status(&self, _status: &SyncStatus) {}
    fn emit_progress(&self, _pending: usize, _replayed: usize) {}
    fn emit_error(&self, _message: &str, _retryable: bool) {}
}

// =============================================================================
// Sync Agent
// =============================================================================

/// Flush-on-reconnect orchestrator.
pub struct SyncAgent {
    config: Arc<SyncConfig>,
    flusher: Arc<SyncFlusher>,
    monitor: ConnectivityMonitor,
    probe: Option<Arc<dyn ReachabilityProbe>>,
    status: Arc<RwLock<SyncStatus>>,
    emitter: Arc<dyn SyncEventEmitter>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    tasks: Vec<JoinHandle<()>>,
}

impl SyncAgent {
    pub fn new(config: SyncConfig, flusher: Arc<SyncFlusher>, monitor: ConnectivityMonitor) -> Self {
        SyncAgent {
            config: Arc::new(config),
            flusher,
            monitor,
            probe: None,
            status: Arc::new(RwLock::new(SyncStatus::default())),
            emitter: Arc::new(NoOpEmitter),
            shutdown_tx: None,
            tasks: Vec::new(),
        }
    }

    pub async fn status(&self) -> SyncStatus {
        self.status.read().await.clone()
    }

    pub fn monitor(&self) -> &ConnectivityMonitor {
        &self.monitor
    }

    /// Runs one flush right now, outside the reconnect loop.
    pub async fn flush_now(&self) -> SyncResult<FlushReport> {
        Self::run_flush(&self.flusher, &self.status, self.emitter.as_ref()).await
    }

    /// Starts the agent.
    ///
    /// Spawns the reachability probe (when one was supplied) and the loop
    /// that flushes on reconnect. Runs until [`shutdown`](Self::shutdown).
    pub async fn start(&mut self) -> SyncResult<SyncAgentHandle> {
        if self.shutdown_tx.is_some() {
            return Err(SyncError::Internal("sync agent already started".into()));
        }

        info!(
            device_id = %self.config.device_id(),
            connected = self.monitor.is_connected(),
            "Starting flush agent"
        );

        // Subscribe before anything can report, so no transition is missed.
        let events = self.monitor.events();

        if let Some(probe) = &self.probe {
            let interval = self.config.connectivity.poll_interval();
            self.tasks
                .push(self.monitor.spawn_probe(probe.clone(), interval));
        }

        {
            let pending = self.flusher.queue().pending().await.unwrap_or_default();
            let mut s = self.status.write().await;
            s.connected = self.monitor.is_connected();
            s.pending = pending;
        }

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        self.shutdown_tx = Some(shutdown_tx.clone());

        self.tasks.push(tokio::spawn(Self::run_loop(
            self.flusher.clone(),
            self.monitor.clone(),
            self.status.clone(),
            self.emitter.clone(),
            self.config.sync.flush_on_startup,
            events,
            shutdown_rx,
        )));

        info!("Watching for reconnects");
        Ok(SyncAgentHandle::new(shutdown_tx, self.status.clone()))
    }

    /// Stops the agent and its probe.
    pub async fn shutdown(&mut self) -> SyncResult<()> {
        info!("Stopping flush agent");

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }

        for task in self.tasks.drain(..) {
            task.abort();
        }

        info!("Flush agent stopped");
        Ok(())
    }

    async fn run_loop(
        flusher: Arc<SyncFlusher>,
        monitor: ConnectivityMonitor,
        status: Arc<RwLock<SyncStatus>>,
        emitter: Arc<dyn SyncEventEmitter>,
        flush_on_startup: bool,
        mut events: broadcast::Receiver<bool>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        let mut was_connected = monitor.is_connected();

        if was_connected && flush_on_startup {
            debug!("Online at startup, flushing");
            let _ = Self::run_flush(&flusher, &status, emitter.as_ref()).await;
        }

        loop {
            tokio::select! {
                event = events.recv() => {
                    let connected = match event {
                        Ok(connected) => connected,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "Missed connectivity events, resampling");
                            monitor.is_connected()
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    };

                    {
                        let mut s = status.write().await;
                        s.connected = connected;
                        emitter.emit_status(&s);
                    }

                    if connected && !was_connected {
                        info!("Connection restored, flushing offline writes");
                        let _ = Self::run_flush(&flusher, &status, emitter.as_ref()).await;
                    }
                    was_connected = connected;
                }

                _ = shutdown_rx.recv() => {
                    info!("Reconnect loop asked to stop");
                    break;
                }
            }
        }

        info!("Reconnect loop exited");
    }

    async fn run_flush(
        flusher: &SyncFlusher,
        status: &RwLock<SyncStatus>,
        emitter: &dyn SyncEventEmitter,
    ) -> SyncResult<FlushReport> {
        status.write().await.flushing = true;

        let result = flusher.flush_all().await;
        let pending = flusher.queue().pending().await.unwrap_or_default();

        let mut s = status.write().await;
        s.flushing = false;
        s.pending = pending;

        match &result {
            Ok(report) => {
                s.last_flush_at = Some(report.finished_at);
                s.last_report = Some(report.clone());
                s.last_error = report.error.clone();
                emitter.emit_progress(pending, report.replayed());
                if let Some(message) = &report.error {
                    emitter.emit_error(message, true);
                }
            }
            Err(e) => {
                error!(error = %e, "Flush could not read the offline queue");
                s.last_error = Some(e.to_string());
                emitter.emit_error(&e.to_string(), e.is_retryable());
            }
        }

        emitter.emit_status(&s);
        result
    }
}

// =============================================================================
// Handle
// =============================================================================

/// Cloneable view of a started agent, for status queries and stop.
#[derive(Clone)]
pub struct SyncAgentHandle {
    shutdown_tx: mpsc::Sender<()>,
    status: Arc<RwLock<SyncStatus>>,
}

impl SyncAgentHandle {
    pub(crate) fn new(shutdown_tx: mpsc::Sender<()>, status: Arc<RwLock<SyncStatus>>) -> Self {
        SyncAgentHandle {
            shutdown_tx,
            status,
        }
    }

    pub async fn status(&self) -> SyncStatus {
        self.status.read().await.clone()
    }

    /// Signals the agent loop to stop.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Assembles an agent; only the flusher is mandatory.
pub struct SyncAgentBuilder {
    config: SyncConfig,
    flusher: Option<Arc<SyncFlusher>>,
    monitor: Option<ConnectivityMonitor>,
    probe: Option<Arc<dyn ReachabilityProbe>>,
    emitter: Option<Arc<dyn SyncEventEmitter>>,
}

impl SyncAgentBuilder {
    pub fn new(config: SyncConfig) -> Self {
        SyncAgentBuilder {
            config,
            flusher: None,
            monitor: None,
            probe: None,
            emitter: None,
        }
    }

    pub fn with_flusher(mut self, flusher: Arc<SyncFlusher>) -> Self {
        self.flusher = Some(flusher);
        self
    }

    pub fn with_monitor(mut self, monitor: ConnectivityMonitor) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// Polls `probe` at the configured interval while the agent runs.
    pub fn with_probe(mut self, probe: Arc<dyn ReachabilityProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn with_emitter(mut self, emitter: Arc<dyn SyncEventEmitter>) -> Self {
        self.emitter = Some(emitter);
        self
    }

    pub fn build(self) -> SyncResult<SyncAgent> {
        let flusher = self
            .flusher
            .ok_or_else(|| SyncError::InvalidConfig("sync agent needs a flusher".into()))?;
        let monitor = self.monitor.unwrap_or_default();

        let mut agent = SyncAgent::new(self.config, flusher, monitor);
        agent.probe = self.probe;
        if let Some(emitter) = self.emitter {
            agent.emitter = emitter;
        }
        Ok(agent)
    }
}
