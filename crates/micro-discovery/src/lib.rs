//! micro-discovery — finds live NATS micro services and snapshots their stats.
//!
//! # Architecture
//!
//! ```text
//! DiscoveryPoller (one background task)
//!   ├── interval tick (missed ticks skipped, never queued)
//!   ├── StatsClient::discover(timeout)
//!   │     ├── StatsTransport::request_all("$SRV.STATS")
//!   │     └── decode_stats() per reply, bad replies counted and dropped
//!   └── SnapshotStore::publish(Snapshot)
//! ```
//!
//! # Freshness over availability
//!
//! When the bus cannot be reached the poller publishes an *empty* snapshot
//! (with `bus_up = false`) instead of keeping the previous one. Scrapers see
//! "no data" for that cycle rather than numbers that silently went stale.
//! The next tick retries automatically.
//!
//! The transport is a trait so the exporter binary can plug in a NATS client
//! while tests drive the poller with scripted replies.

pub mod client;
pub mod error;
pub mod poller;
pub mod wire;

#[cfg(test)]
mod testing;

pub use client::{DiscoveryReport, ReplyStream, StatsClient, StatsTransport, STATS_SUBJECT};
pub use error::{DiscoveryError, DiscoveryResult};
pub use poller::{DiscoveryPoller, PollState, PollerConfig};
pub use wire::decode_stats;
