// Lifecycle event fan-out and disposable subscriptions

use super::types::AppLifecycleState;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::debug;

const DEFAULT_CAPACITY: usize = 64;

/// Delivers host lifecycle notifications to subscribers in order.
///
/// The most recent state is also kept aside so a subscriber that fell behind
/// can resync without replaying its backlog.
#[derive(Clone)]
pub struct LifecycleNotifier {
    tx: broadcast::Sender<AppLifecycleState>,
    latest: watch::Sender<Option<AppLifecycleState>>,
}

impl LifecycleNotifier {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        let (latest, _) = watch::channel(None);
        Self { tx, latest }
    }

    /// Publish a state change, returns the number of subscribers reached
    pub fn publish(&self, state: AppLifecycleState) -> usize {
        debug!("Lifecycle event: {}", state);
        self.latest.send_replace(Some(state));
        self.tx.send(state).unwrap_or(0)
    }

    /// Last state published, if any
    pub fn latest(&self) -> Option<AppLifecycleState> {
        *self.latest.borrow()
    }

    pub(crate) fn watch_latest(&self) -> watch::Receiver<Option<AppLifecycleState>> {
        self.latest.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppLifecycleState> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for LifecycleNotifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a running lifecycle subscription; released on `remove` or drop
pub struct MonitorSubscription {
    handle: Option<JoinHandle<()>>,
}

impl MonitorSubscription {
    pub(crate) fn new(handle: JoinHandle<()>) -> Self {
        Self {
            handle: Some(handle),
        }
    }

    /// Stop receiving lifecycle events
    pub fn remove(mut self) {
        self.release();
    }

    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    fn release(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("Lifecycle subscription released");
        }
    }
}

impl Drop for MonitorSubscription {
    fn drop(&mut self) {
        self.release();
    }
}
