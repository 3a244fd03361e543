//! micro-state — the in-memory view of a NATS micro service fleet.
//!
//! Holds the statistics reported by every live service instance as one
//! immutable [`Snapshot`] and publishes new snapshots through a lock-free
//! [`SnapshotStore`].
//!
//! # Architecture
//!
//! ```text
//! DiscoveryPoller ── publish(Snapshot) ──┐
//!                                        ▼
//!                              SnapshotStore (ArcSwap<Snapshot>)
//!                                        │
//! scrape ◄──── current() → Arc<Snapshot> ┘
//! ```
//!
//! Snapshots are built once per poll cycle and never mutated. A reader holds
//! an `Arc` to the generation it loaded, so a concurrent publish can never
//! hand it a half-built view. Nothing is persisted: the fleet is rediscovered
//! from the bus on every cycle.

pub mod store;
pub mod types;

pub use store::SnapshotStore;
pub use types::*;
