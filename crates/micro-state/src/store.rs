//! SnapshotStore — single-writer, many-reader holder of the current snapshot.
//!
//! Backed by [`ArcSwap`]: publishing is one atomic pointer swap and reading
//! is a lock-free load, so scrapes never wait on the poller and never wait
//! on each other.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::debug;

use crate::types::Snapshot;

/// Thread-safe holder of the most recently published [`Snapshot`].
///
/// `Clone` shares the same underlying slot, so the poller and every scrape
/// handler can hold their own handle.
#[derive(Clone)]
pub struct SnapshotStore {
    current: Arc<ArcSwap<Snapshot>>,
}

impl SnapshotStore {
    /// Create a store that serves [`Snapshot::empty`] until the first publish.
    pub fn new() -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(Snapshot::empty())),
        }
    }

    /// Replace the current snapshot.
    ///
    /// Readers that already loaded the previous snapshot keep it until they
    /// drop their `Arc`.
    pub fn publish(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        self.current.store(Arc::clone(&snapshot));
        debug!(
            generation = snapshot.generation,
            services = snapshot.len(),
            "snapshot published"
        );
        snapshot
    }

    /// The last published snapshot.
    pub fn current(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}
