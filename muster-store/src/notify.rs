//! Change notification fan-out for views.
//!
//! The store publishes a [`RefreshEvent`] after every cache mutation so open
//! views can re-read without polling. Delivery is lossy: a slow subscriber
//! that misses events re-reads on the next one it receives.

use tokio::sync::broadcast;
use tracing::debug;

const DEFAULT_CAPACITY: usize = 64;

/// Which family of views an event invalidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTopic {
    /// Roster, settings, roles or invites changed.
    Data,
    /// The audit trail changed.
    Logs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshEvent {
    pub topic: RefreshTopic,
    /// `None` means every section may be stale (e.g. after a queue replay).
    pub section_key: Option<String>,
}

/// Broadcast sender for refresh events. Cheap to clone; all clones feed the
/// same subscribers.
#[derive(Clone)]
pub struct ChangeNotifier {
    tx: broadcast::Sender<RefreshEvent>,
}

impl ChangeNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RefreshEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, topic: RefreshTopic, section_key: Option<&str>) {
        let event = RefreshEvent {
            topic,
            section_key: section_key.map(str::to_owned),
        };
        debug!(?event, "publishing refresh");
        // Send fails only when no subscriber is listening, which is normal
        // when no views are open.
        let _ = self.tx.send(event);
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
