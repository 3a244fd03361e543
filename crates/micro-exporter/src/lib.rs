//! micro-exporter — wiring for the NATS micro Prometheus exporter.
//!
//! The discovery engine lives in `micro-discovery`, the snapshot in
//! `micro-state` and the Prometheus mapping in `micro-metrics`. This crate
//! only supplies the collaborators around them:
//!
//! - [`config`]: flags and environment variables
//! - [`nats`]: NATS connection and the `StatsTransport` adapter
//! - [`http`]: the axum router serving `/metrics` and `/services`

pub mod config;
pub mod http;
pub mod nats;

pub use config::{Auth, ConfigError, ExporterConfig};
pub use http::build_router;
pub use nats::NatsTransport;
