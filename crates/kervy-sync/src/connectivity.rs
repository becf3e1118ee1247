//! # Connectivity Monitor
//!
//! Tracks whether the device can reach the network and notifies listeners on
//! every reachability event.
//!
//! ## Event Flow
//! ```text
//! ┌──────────────────┐   set_connected(bool)   ┌─────────────────────────┐
//! │ ReachabilityProbe│ ──────────────────────► │  ConnectivityMonitor    │
//! │ (TCP connect,    │   (only on change)      │                         │
//! │  polled)         │                         │  watch<bool>  ─► state  │
//! └──────────────────┘                         │  broadcast<bool> ─► subs│
//!                                              └────────────┬────────────┘
//!   platform events ── set_connected(bool) ────────────────►│
//!                                                           ▼
//!                                              subscribe(callback)
//!                                              SyncAgent (flush on ↑)
//! ```
//!
//! Subscribers see events in the order they were reported. The monitor adds no
//! deduplication of its own; the polling driver only reports changes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

const EVENT_BUFFER: usize = 64;

// =============================================================================
// Reachability Probe
// =============================================================================

/// Answers "can we reach the network right now?".
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    async fn probe(&self) -> bool;
}

/// Probe that opens (and immediately drops) a TCP connection.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    addr: String,
    timeout: Duration,
}

impl TcpProbe {
    /// `addr` is `host:port`, e.g. `firestore.googleapis.com:443`.
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        TcpProbe {
            addr: addr.into(),
            timeout,
        }
    }
}

#[async_trait]
impl ReachabilityProbe for TcpProbe {
    async fn probe(&self) -> bool {
        match tokio::time::timeout(self.timeout, TcpStream::connect(&self.addr)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!(addr = %self.addr, error = %e, "Reachability probe failed");
                false
            }
            Err(_) => {
                debug!(addr = %self.addr, "Reachability probe timed out");
                false
            }
        }
    }
}

// =============================================================================
// Connectivity Monitor
// =============================================================================

/// Shared reachability state.
///
/// Cloning is cheap; every clone observes the same state.
#[derive(Clone)]
pub struct ConnectivityMonitor {
    state: Arc<watch::Sender<bool>>,
    events: broadcast::Sender<bool>,
}

impl ConnectivityMonitor {
    pub fn new(initially_connected: bool) -> Self {
        let (state, _) = watch::channel(initially_connected);
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        ConnectivityMonitor {
            state: Arc::new(state),
            events,
        }
    }

    /// Current reachability sample.
    pub fn is_connected(&self) -> bool {
        *self.state.borrow()
    }

    /// Reports a reachability event from the platform or a probe.
    pub fn set_connected(&self, connected: bool) {
        let previous = self.state.send_replace(connected);
        if previous != connected {
            info!(connected, "Connectivity changed");
        }
        // No receivers is fine; nobody is subscribed yet.
        let _ = self.events.send(connected);
    }

    /// Receiver that always holds the latest state.
    pub fn watch(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }

    /// Raw event stream, one message per reported event.
    pub fn events(&self) -> broadcast::Receiver<bool> {
        self.events.subscribe()
    }

    /// Invokes `callback(is_connected)` for every reported event.
    ///
    /// The returned task runs until the monitor and all its clones are
    /// dropped, or until it is aborted.
    pub fn subscribe<F>(&self, mut callback: F) -> JoinHandle<()>
    where
        F: FnMut(bool) + Send + 'static,
    {
        let mut rx = self.events.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(connected) => callback(connected),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Connectivity subscriber fell behind");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Polls `probe` every `interval` and reports changes.
    pub fn spawn_probe(
        &self,
        probe: Arc<dyn ReachabilityProbe>,
        interval: Duration,
    ) -> JoinHandle<()> {
        let monitor = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let reachable = probe.probe().await;
                if reachable != monitor.is_connected() {
                    monitor.set_connected(reachable);
                }
            }
        })
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::mpsc;

    struct SwitchProbe(AtomicBool);

    #[async_trait]
    impl ReachabilityProbe for SwitchProbe {
        async fn probe(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }

    #[tokio::test]
    async fn test_set_connected_updates_state() {
        let monitor = ConnectivityMonitor::new(false);
        let mut rx = monitor.watch();

        monitor.set_connected(true);
        assert!(monitor.is_connected());
        rx.changed().await.unwrap();
        assert!(*rx.borrow());
    }

    #[tokio::test]
    async fn test_subscribe_sees_every_event_in_order() {
        let monitor = ConnectivityMonitor::new(false);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = monitor.subscribe(move |connected| {
            let _ = tx.send(connected);
        });

        monitor.set_connected(true);
        monitor.set_connected(true);
        monitor.set_connected(false);

        assert_eq!(rx.recv().await, Some(true));
        assert_eq!(rx.recv().await, Some(true));
        assert_eq!(rx.recv().await, Some(false));
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_reports_changes() {
        let monitor = ConnectivityMonitor::new(false);
        let probe = Arc::new(SwitchProbe(AtomicBool::new(false)));
        let handle = monitor.spawn_probe(probe.clone(), Duration::from_secs(5));

        let mut events = monitor.events();
        probe.0.store(true, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(6)).await;

        assert_eq!(events.recv().await.unwrap(), true);
        assert!(monitor.is_connected());
        handle.abort();
    }

    #[tokio::test]
    async fn test_tcp_probe_against_local_listener() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let probe = TcpProbe::new(addr, Duration::from_secs(1));
        assert!(probe.probe().await);

        drop(listener);
        let closed = TcpProbe::new("127.0.0.1:1", Duration::from_millis(200));
        assert!(!closed.probe().await);
    }
}
