//! micro-metrics — Prometheus exposition for the fleet snapshot.
//!
//! [`MicroCollector`] implements the two-phase pull contract of
//! [`prometheus::core::Collector`]: `desc()` declares a fixed set of metric
//! families once, `collect()` reads the last published snapshot on every
//! scrape. Collection never reaches the bus, so scrape latency does not
//! depend on discovery latency.
//!
//! # Architecture
//!
//! ```text
//! Registry::gather()
//!   └── MicroCollector::collect()
//!         └── SnapshotStore::current() → one sample per service × endpoint
//!
//! render_prometheus() → text/plain for the /metrics endpoint
//! ```

pub mod collector;
pub mod exposition;

pub use collector::MicroCollector;
pub use exposition::{render_prometheus, CONTENT_TYPE};
