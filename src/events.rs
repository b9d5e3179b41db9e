//! # Feed Event Bus
//!
//! Explicit, injectable pub/sub for ranking lifecycle events. Subscribers get
//! their own receiver and drop it to unsubscribe; there is no module-level
//! listener array and no teardown ordering to get wrong. Lagging subscribers
//! miss events rather than blocking the ranking path.

use serde::Serialize;
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 64;

/// One ranking pass completed. Enough for dashboards and cache warmers;
/// deliberately free of per-item payloads.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FeedEvent {
    /// Anonymized user hash, or None for anonymous requests.
    pub user: Option<String>,
    pub candidates: usize,
    pub kept: usize,
    pub hidden: usize,
    pub elapsed_ms: u64,
}

#[derive(Clone)]
pub struct FeedEventBus {
    tx: broadcast::Sender<FeedEvent>,
}

impl Default for FeedEventBus {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl FeedEventBus {
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to future events. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.tx.subscribe()
    }

    /// Publish, ignoring the no-subscribers case: ranking never depends on
    /// anyone listening.
    pub fn publish(&self, event: FeedEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
