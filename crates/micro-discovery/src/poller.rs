//! Discovery poller — background task that keeps the snapshot fresh.
//!
//! Each tick moves the poller from `Idle` to `Polling`: it asks the fleet for
//! stats, folds the replies into a new [`Snapshot`], publishes it, and goes
//! back to `Idle`. Failed and partial cycles both end the cycle; nothing is
//! retried until the next tick.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use micro_state::{Snapshot, SnapshotStore};

use crate::client::{StatsClient, StatsTransport};

/// Where the poller is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Waiting for the next tick.
    Idle,
    /// Discovery and snapshot build in progress.
    Polling,
}

/// Timing for the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    /// Time between cycle starts.
    pub interval: Duration,
    /// How long each cycle waits for replies.
    pub timeout: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15),
            timeout: Duration::from_secs(2),
        }
    }
}

/// Owns the refresh loop and is the only writer of the [`SnapshotStore`].
pub struct DiscoveryPoller {
    client: StatsClient,
    store: SnapshotStore,
    config: PollerConfig,
    polling: AtomicBool,
    generation: AtomicU64,
}

/// Flips the poller back to `Idle` even if the cycle future is dropped.
struct PollingGuard<'a>(&'a AtomicBool);

impl<'a> PollingGuard<'a> {
    fn enter(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for PollingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl DiscoveryPoller {
    /// Create a poller that publishes into `store`.
    pub fn new(
        transport: Arc<dyn StatsTransport>,
        store: SnapshotStore,
        config: PollerConfig,
    ) -> Self {
        Self {
            client: StatsClient::new(transport),
            store,
            config,
            polling: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> PollState {
        if self.polling.load(Ordering::Acquire) {
            PollState::Polling
        } else {
            PollState::Idle
        }
    }

    /// Run one discovery cycle and publish its snapshot.
    ///
    /// A bus failure publishes an empty snapshot marked `bus_up = false`
    /// rather than leaving the previous one in place.
    pub async fn poll_once(&self) -> Arc<Snapshot> {
        let _guard = PollingGuard::enter(&self.polling);
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let started = Instant::now();

        let snapshot = match self.client.discover(self.config.timeout).await {
            Ok(report) => {
                let services = report.services.len();
                let snapshot =
                    Snapshot::from_services(generation, Utc::now(), report.services, report.skipped);
                debug!(
                    generation,
                    replies = services,
                    services = snapshot.len(),
                    skipped = report.skipped,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "poll cycle complete"
                );
                snapshot
            }
            Err(e) => {
                warn!(
                    generation,
                    error = %e,
                    "discovery failed, publishing empty snapshot"
                );
                Snapshot::unavailable(generation, Utc::now())
            }
        };

        self.store.publish(snapshot)
    }

    /// Poll on every tick until shutdown.
    ///
    /// A tick that came due while the previous cycle was still running is
    /// skipped, so an overrunning cycle is followed by an idle gap until the
    /// next tick on schedule. On shutdown an in-flight poll is dropped rather
    /// than awaited.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.config.interval.as_secs_f64(),
            timeout_ms = self.config.timeout.as_millis() as u64,
            "discovery poller started"
        );

        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut busy_until: Option<Instant> = None;

        loop {
            if *shutdown.borrow() {
                break;
            }

            let due = tokio::select! {
                due = ticker.tick() => due,
                _ = shutdown.changed() => break,
            };

            if busy_until.is_some_and(|end| due < end) {
                debug!("poll cycle overran the interval, skipping tick");
                continue;
            }

            tokio::select! {
                _ = self.poll_once() => busy_until = Some(Instant::now()),
                _ = shutdown.changed() => {
                    debug!("abandoning in-flight poll");
                    break;
                }
            }
        }

        info!("discovery poller shutting down");
    }
}
